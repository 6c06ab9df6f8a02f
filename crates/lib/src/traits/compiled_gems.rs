//! Gem compilation fix-ups.
//!
//! When gems are compiled, files matching `gem_excludes` are still needed
//! in source form, and compiled gem classes can end up under a doubled
//! `WEB-INF/WEB-INF/` prefix.

use regex::Regex;
use tracing::warn;
use walkdir::WalkDir;

use super::{ArchiveContext, Trait, TraitError, TraitKind};
use crate::archive::{EntrySource, FileManifest};
use crate::collect::slash_path;
use crate::pathmap::category;

pub struct CompiledGemsTrait;

impl CompiledGemsTrait {
  fn copy_excluded_files(cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    let excludes: Vec<Regex> = cx
      .config
      .gem_excludes
      .iter()
      .filter_map(|pattern| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
          warn!(pattern = %pattern, error = %e, "ignoring invalid gem exclude");
          None
        }
      })
      .collect();
    if excludes.is_empty() {
      return Ok(());
    }

    for spec in cx.gems {
      let Some(gem_dir) = spec.full_gem_path() else {
        continue;
      };
      for entry in WalkDir::new(&gem_dir).min_depth(1).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
          continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&gem_dir) else {
          continue;
        };
        let rel = slash_path(rel);
        if excludes.iter().any(|re| re.is_match(&rel)) {
          let dest = cx.apply_pathmaps(category::GEMS, &format!("{}/{}", spec.full_name(), rel))?;
          files.insert(dest, EntrySource::File(entry.path().to_path_buf()));
        }
      }
    }
    Ok(())
  }

  fn fix_double_web_inf_paths(files: &mut FileManifest) {
    files.rename_all(|path| match path.strip_prefix("WEB-INF/WEB-INF") {
      Some(rest) => format!("WEB-INF{}", rest),
      None => path.to_string(),
    });
  }
}

impl Trait for CompiledGemsTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::CompiledGems
  }

  fn update_archive(&self, cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    if !cx.config.compile_gems {
      return Ok(());
    }
    Self::copy_excluded_files(cx, files)?;
    Self::fix_double_web_inf_paths(files);
    Ok(())
  }
}
