//! Readers for Bundler's on-disk artefacts.
//!
//! Gem selection for Bundler-managed projects comes from the lockfile: the
//! top-level dependencies whose Gemfile groups are not all excluded, plus
//! everything they depend on.

mod gemfile;
mod lockfile;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

pub use gemfile::{DEFAULT_GROUP, GemfileGroups};
pub use lockfile::{LockSource, LockedSpec, Lockfile};

#[derive(Debug, Error)]
pub enum BundlerError {
  #[error("lockfile {} not found; run `bundle install` first", .0.display())]
  LockfileMissing(PathBuf),

  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed lockfile at line {line}: {message}")]
  Lockfile { line: usize, message: String },
}

/// The lockfile paired with a Gemfile: `Gemfile.lock`, or `gems.locked`
/// for `gems.rb`.
pub fn lockfile_path(gemfile: &Path) -> PathBuf {
  if gemfile.file_name().is_some_and(|n| n == "gems.rb") {
    gemfile.with_file_name("gems.locked")
  } else {
    let mut name = gemfile.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
  }
}

/// Locked gems needed outside the `without` groups, in lockfile order.
///
/// Gems sourced from a local `PATH` are left out with a warning.
pub fn locked_gems(gemfile: &Path, without: &[String]) -> Result<Vec<LockedSpec>, BundlerError> {
  let lock_path = lockfile_path(gemfile);
  if !lock_path.is_file() {
    return Err(BundlerError::LockfileMissing(lock_path));
  }
  let lock_source = fs::read_to_string(&lock_path).map_err(|e| BundlerError::Io {
    path: lock_path.clone(),
    source: e,
  })?;
  let lockfile = Lockfile::parse(&lock_source)?;

  let groups = match fs::read_to_string(gemfile) {
    Ok(source) => GemfileGroups::parse(&source),
    Err(e) => {
      warn!(path = %gemfile.display(), error = %e, "cannot read Gemfile; treating every gem as default group");
      GemfileGroups::default()
    }
  };

  Ok(select(&lockfile, &groups, without))
}

/// The closure of the lockfile's top-level dependencies that belong to at
/// least one group not listed in `without`.
pub fn select(lockfile: &Lockfile, groups: &GemfileGroups, without: &[String]) -> Vec<LockedSpec> {
  let default = [DEFAULT_GROUP.to_string()];
  let mut wanted: HashSet<&str> = HashSet::new();
  let mut pending: Vec<&str> = Vec::new();

  for name in &lockfile.dependencies {
    let member_of = groups.groups_of(name).unwrap_or(&default);
    if member_of.iter().any(|g| !without.contains(g)) {
      pending.push(name);
    } else {
      debug!(gem = %name, "gem excluded by bundle_without");
    }
  }

  while let Some(name) = pending.pop() {
    if !wanted.insert(name) {
      continue;
    }
    if let Some(spec) = lockfile.spec(name) {
      pending.extend(spec.dependencies.iter().map(String::as_str));
    }
  }

  let mut seen = HashSet::new();
  let mut out = Vec::new();
  for spec in &lockfile.specs {
    if !wanted.contains(spec.name.as_str()) || !seen.insert(spec.name.as_str()) {
      continue;
    }
    let Some(chosen) = lockfile.spec(&spec.name) else {
      continue;
    };
    if chosen.source == LockSource::Path {
      warn!(gem = %chosen.name, "skipping gem from a local path source");
      continue;
    }
    out.push(chosen.clone());
  }
  out
}
