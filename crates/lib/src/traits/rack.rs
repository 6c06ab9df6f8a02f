//! Rack applications.

use std::env;
use std::path::PathBuf;

use super::{Project, Trait, TraitError, TraitKind};
use crate::config::{Config, InitFragment, InitTemplate};

pub struct RackTrait;

impl Trait for RackTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::Rack
  }

  fn before_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.set_webxml(&["booter"], "rack");
    let rack_env = env::var("RACK_ENV").unwrap_or_else(|_| "production".to_string());
    config.set_webxml(&["rack", "env"], rack_env);

    let rackup = if project.exists("config.ru") {
      Some("config.ru".to_string())
    } else {
      project.glob("*/config.ru").into_iter().next()
    };
    if let Some(rackup) = rackup {
      config.webinf_files.push(PathBuf::from(rackup));
    }
    Ok(())
  }

  fn after_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.init_contents.push(InitFragment::Template(InitTemplate::Rack));
    Ok(())
  }
}
