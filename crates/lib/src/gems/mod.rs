//! Installed gems: versions, specifications, lookup and dependency resolution.

mod repository;
mod resolve;
mod set;
mod spec;
mod version;

use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub use repository::{FsGemRepository, GemRepository};
pub use resolve::GemResolver;
pub use set::{GemEntry, GemSpecSet};
pub use spec::{Dependency, DependencyKind, GemSpec, SpecParseError};
pub use version::{GemVersion, Op, Requirement, VersionError};

#[derive(Debug, Error)]
pub enum GemError {
  #[error("gem '{name}' ({requirement}) is not installed")]
  NotFound { name: String, requirement: String },

  #[error(transparent)]
  InvalidRequirement(#[from] VersionError),

  #[error(transparent)]
  Spec(#[from] SpecParseError),
}

/// Gem directories from `GEM_HOME` followed by the entries of `GEM_PATH`.
pub fn default_gem_paths() -> Vec<PathBuf> {
  let mut paths = Vec::new();
  if let Some(home) = env::var_os("GEM_HOME").filter(|v| !v.is_empty()) {
    paths.push(PathBuf::from(home));
  }
  if let Some(path) = env::var_os("GEM_PATH") {
    for dir in env::split_paths(&path) {
      if !dir.as_os_str().is_empty() && !paths.contains(&dir) {
        paths.push(dir);
      }
    }
  }
  paths
}
