mod build;
mod clean;
mod config;
mod traits;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use warbler_lib::application::Application;

pub use build::{ArchiveKind, cmd_build};
pub use clean::cmd_clean;
pub use config::{cmd_config_init, cmd_config_print};
pub use traits::cmd_traits;

/// Where the project lives and which configuration file to read.
pub struct ProjectArgs {
  pub dir: PathBuf,
  pub config: Option<PathBuf>,
}

impl ProjectArgs {
  /// Configure the project.
  pub fn load(&self) -> Result<Application> {
    Application::load(&self.dir, self.config.as_deref()).map_err(lib_err)
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }
}

// Lua errors are not `Send + Sync`, so library errors are carried as text.
pub fn lib_err(e: impl std::fmt::Display) -> anyhow::Error {
  anyhow!("{}", e)
}
