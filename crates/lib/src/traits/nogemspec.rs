//! Plain Ruby projects packaged as a jar.

use super::{ArchiveContext, Project, Trait, TraitError, TraitKind, add_init_load_path, add_main_rb, first_bin_script};
use crate::archive::FileManifest;
use crate::config::Config;
use crate::pathmap::category;

pub struct NoGemspecTrait;

impl Trait for NoGemspecTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::NoGemspec
  }

  fn before_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.dirs = vec![".".to_string()];
    Ok(())
  }

  fn after_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    if project.is_dir("lib") {
      add_init_load_path(config, "lib")?;
    }
    Ok(())
  }

  fn update_archive(&self, cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    let exe = match &cx.config.executable {
      Some(exe) => exe.clone(),
      None => first_bin_script(cx.project).ok_or(TraitError::NoExecutable)?,
    };
    let bin_path = cx.apply_pathmaps(category::APPLICATION, &exe)?;
    add_main_rb(files, &bin_path, cx.config.executable_params.as_deref());
    Ok(())
  }
}
