//! Bundler-managed projects.
//!
//! The gem list is replaced by the locked gems of every Gemfile group not
//! listed in `bundle_without`. Locked versions are already a complete
//! closure, so dependency resolution is turned off.

use tracing::debug;

use super::{ArchiveContext, Project, Trait, TraitError, TraitKind};
use crate::archive::FileManifest;
use crate::bundler::{locked_gems, lockfile_path};
use crate::collect::slash_path;
use crate::config::{Config, InitFragment};
use crate::pathmap::category;

pub struct BundlerTrait;

/// A Bundler file as a project-relative path.
fn relative(project: &Project, path: &std::path::Path) -> Option<String> {
  path.strip_prefix(project.dir()).ok().map(slash_path)
}

impl Trait for BundlerTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::Bundler
  }

  fn before_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.bundler = true;
    config.bundle_without = vec!["development".to_string(), "test".to_string()];
    Ok(())
  }

  fn after_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    if !config.bundler {
      return Ok(());
    }
    let specs = locked_gems(&project.gemfile(), &config.bundle_without)?;
    debug!(gems = specs.len(), "using locked gems");

    config.gems.clear();
    config.gem_dependencies = false;
    for spec in specs {
      config.gems.add_with_requirement(&spec.name, &format!("= {}", spec.version));
    }
    config.init_contents.push(InitFragment::Text(format!(
      "ENV['BUNDLE_WITHOUT'] = '{}'\n",
      config.bundle_without.join(":")
    )));
    Ok(())
  }

  fn update_archive(&self, cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    if !cx.config.bundler {
      return Ok(());
    }
    let gemfile = cx.project.gemfile();
    for path in [lockfile_path(&gemfile), gemfile] {
      let Some(rel) = relative(cx.project, &path).filter(|_| path.is_file()) else {
        continue;
      };
      cx.add_with_pathmaps(files, category::APPLICATION, &rel)?;
    }
    Ok(())
  }
}
