//! Rails applications.

use std::env;

use tracing::debug;

use super::{Project, Trait, TraitError, TraitKind};
use crate::config::{Config, InitFragment, InitTemplate};

pub struct RailsTrait;

impl Trait for RailsTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::Rails
  }

  fn before_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    if let Some(name) = project.dir().file_name() {
      config.jar_name = name.to_string_lossy().into_owned();
    }
    let rails_env = env::var("RAILS_ENV").unwrap_or_else(|_| "production".to_string());
    config.set_webxml(&["rails", "env"], rails_env);
    config.set_webxml(&["booter"], "rails");

    // Without a Gemfile the framework itself has to be packaged as a gem,
    // unless it is vendored into the application.
    if !project.gemfile().is_file() && !project.is_dir("vendor/rails") {
      debug!("adding the rails gem");
      config.gems.add("rails");
    }
    Ok(())
  }

  fn after_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.init_contents.push(InitFragment::Template(InitTemplate::Rails));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gems::FsGemRepository;
  use crate::util::testutil::write_files;
  use serial_test::serial;
  use tempfile::TempDir;

  fn configure(files: &[(&str, &str)]) -> Config {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("blog");
    write_files(&root, files);
    let project = Project::new(&root, FsGemRepository::default());
    let mut config = Config::default();
    temp_env::with_vars([("RAILS_ENV", None::<&str>), ("BUNDLE_GEMFILE", None)], || {
      let mut t = RailsTrait;
      t.before_configure(&project, &mut config).unwrap();
      t.after_configure(&project, &mut config).unwrap();
    });
    config
  }

  #[test]
  #[serial]
  fn rails_defaults() {
    let config = configure(&[("config/environment.rb", "")]);
    assert_eq!(config.jar_name, "blog");
    assert_eq!(config.booter(), Some("rails"));
    assert_eq!(config.webxml_value(&["rails", "env"]).unwrap(), "production");
    assert!(config.gems.contains("rails"));
    assert_eq!(config.init_contents, vec![InitFragment::Template(InitTemplate::Rails)]);
  }

  #[test]
  #[serial]
  fn bundled_or_vendored_rails_is_not_added() {
    let config = configure(&[("config/environment.rb", ""), ("Gemfile", "gem 'rails'\n")]);
    assert!(!config.gems.contains("rails"));

    let config = configure(&[("config/environment.rb", ""), ("vendor/rails/README", "")]);
    assert!(!config.gems.contains("rails"));
  }
}
