//! Merb applications.

use tracing::warn;

use super::{Project, Trait, TraitError, TraitKind};
use crate::config::Config;

pub struct MerbTrait;

impl Trait for MerbTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::Merb
  }

  fn before_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.set_webxml(&["booter"], "merb");
    warn!("merb dependencies are not detected; list them in `gems`");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gems::FsGemRepository;

  #[test]
  #[tracing_test::traced_test]
  fn merb_uses_its_own_booter() {
    let temp = tempfile::TempDir::new().unwrap();
    let project = Project::new(temp.path(), FsGemRepository::default());
    let mut config = Config::default();
    MerbTrait.before_configure(&project, &mut config).unwrap();
    assert_eq!(config.booter(), Some("merb"));
    assert!(logs_contain("merb dependencies are not detected"));
  }
}
