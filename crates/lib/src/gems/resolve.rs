//! Expansion of requested gems into the specs to package.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::GemError;
use super::repository::GemRepository;
use super::set::GemSpecSet;
use super::spec::GemSpec;
use super::version::Requirement;

/// Resolves a [`GemSpecSet`] against a repository of installed gems.
pub struct GemResolver<'a, R: GemRepository> {
  repository: &'a R,
}

impl<'a, R: GemRepository> GemResolver<'a, R> {
  pub fn new(repository: &'a R) -> Self {
    Self { repository }
  }

  /// Resolve every requested gem, and with `include_dependencies` their
  /// runtime dependencies, depth first.
  ///
  /// Each gem name is visited once; when two paths reach the same name the
  /// first one decides the version. Gems whose installation directory is
  /// missing are left out with a warning, but their dependencies are still
  /// walked.
  pub fn resolve(&self, set: &GemSpecSet, include_dependencies: bool) -> Result<Vec<GemSpec>, GemError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (name, requirement) in set.requirements()? {
      self.visit(&name, &requirement, include_dependencies, &mut seen, &mut out)?;
    }
    Ok(out)
  }

  fn visit(
    &self,
    name: &str,
    requirement: &Requirement,
    include_dependencies: bool,
    seen: &mut HashSet<String>,
    out: &mut Vec<GemSpec>,
  ) -> Result<(), GemError> {
    if !seen.insert(name.to_string()) {
      debug!(gem = name, "already resolved");
      return Ok(());
    }

    let spec = self
      .repository
      .find(name, requirement)
      .ok_or_else(|| GemError::NotFound {
        name: name.to_string(),
        requirement: requirement.to_string(),
      })?;

    match spec.full_gem_path() {
      Some(path) if !path.is_dir() => {
        warn!(gem = %spec.full_name(), path = %path.display(), "gem installation directory not found; skipping");
      }
      _ => {
        debug!(gem = %spec.full_name(), "resolved gem");
        out.push(spec.clone());
      }
    }

    if include_dependencies {
      for dep in spec.runtime_dependencies() {
        self.visit(&dep.name, &dep.requirement, include_dependencies, seen, out)?;
      }
    }
    Ok(())
  }
}
