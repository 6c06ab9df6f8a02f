//! Lookup of installed gem specifications.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::spec::GemSpec;
use super::version::Requirement;

/// Source of installed gem specifications.
pub trait GemRepository {
  /// The best installed spec named `name` satisfying `requirement`.
  ///
  /// The highest matching version wins. Prereleases are only considered when
  /// the requirement itself names one, and a `java` build beats the `ruby`
  /// build of the same version.
  fn find(&self, name: &str, requirement: &Requirement) -> Option<&GemSpec>;
}

/// Specifications read from `specifications/` under one or more gem
/// directories.
#[derive(Debug, Clone, Default)]
pub struct FsGemRepository {
  specs: Vec<GemSpec>,
}

impl FsGemRepository {
  /// Read every `*.gemspec` under `<dir>/specifications` for each directory.
  ///
  /// Missing directories are ignored; specs that fail to parse are skipped
  /// with a warning.
  pub fn load(gem_dirs: &[PathBuf]) -> Self {
    let mut specs = Vec::new();
    for dir in gem_dirs {
      load_dir(dir, &mut specs);
    }
    debug!(count = specs.len(), "loaded installed gem specifications");
    Self { specs }
  }

  pub fn from_specs(specs: Vec<GemSpec>) -> Self {
    Self { specs }
  }

  pub fn specs(&self) -> &[GemSpec] {
    &self.specs
  }
}

fn load_dir(dir: &Path, specs: &mut Vec<GemSpec>) {
  let spec_dir = dir.join("specifications");
  let Ok(entries) = fs::read_dir(&spec_dir) else {
    debug!(path = %spec_dir.display(), "no specifications directory");
    return;
  };

  let mut paths: Vec<PathBuf> = entries
    .filter_map(Result::ok)
    .map(|e| e.path())
    .filter(|p| p.extension().is_some_and(|ext| ext == "gemspec"))
    .collect();
  paths.sort();

  for path in paths {
    match GemSpec::load(&path) {
      Ok(spec) => specs.push(spec),
      Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable gem specification"),
    }
  }
}

impl GemRepository for FsGemRepository {
  fn find(&self, name: &str, requirement: &Requirement) -> Option<&GemSpec> {
    let allow_prerelease = requirement.is_prerelease();
    self
      .specs
      .iter()
      .filter(|s| s.name == name)
      .filter(|s| allow_prerelease || !s.version.is_prerelease())
      .filter(|s| requirement.is_satisfied_by(&s.version))
      .max_by(|a, b| {
        a.version
          .cmp(&b.version)
          .then_with(|| (a.platform == "java").cmp(&(b.platform == "java")))
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gems::version::GemVersion;

  fn spec(name: &str, version: &str, platform: &str) -> GemSpec {
    let mut s = GemSpec::new(name, GemVersion::parse(version).unwrap());
    s.platform = platform.to_string();
    s
  }

  fn req(s: &str) -> Requirement {
    Requirement::parse(s).unwrap()
  }

  #[test]
  fn picks_highest_matching_version() {
    let repo = FsGemRepository::from_specs(vec![
      spec("rack", "2.2.3", "ruby"),
      spec("rack", "3.0.8", "ruby"),
      spec("rack", "2.2.8", "ruby"),
    ]);
    assert_eq!(repo.find("rack", &Requirement::any()).unwrap().version.as_str(), "3.0.8");
    assert_eq!(repo.find("rack", &req("~> 2.2")).unwrap().version.as_str(), "2.2.8");
    assert!(repo.find("rack", &req("> 4")).is_none());
    assert!(repo.find("rake", &Requirement::any()).is_none());
  }

  #[test]
  fn prereleases_need_an_explicit_request() {
    let repo = FsGemRepository::from_specs(vec![spec("rails", "7.0.0", "ruby"), spec("rails", "7.1.0.rc1", "ruby")]);
    assert_eq!(repo.find("rails", &Requirement::any()).unwrap().version.as_str(), "7.0.0");
    assert_eq!(repo.find("rails", &req(">= 7.1.0.rc1")).unwrap().version.as_str(), "7.1.0.rc1");
  }

  #[test]
  fn java_platform_wins_ties() {
    let repo = FsGemRepository::from_specs(vec![spec("nokogiri", "1.15.0", "java"), spec("nokogiri", "1.15.0", "ruby")]);
    assert_eq!(repo.find("nokogiri", &Requirement::any()).unwrap().platform, "java");

    let repo = FsGemRepository::from_specs(vec![spec("nokogiri", "1.15.0", "ruby"), spec("nokogiri", "1.15.0", "java")]);
    assert_eq!(repo.find("nokogiri", &Requirement::any()).unwrap().platform, "java");
  }

  #[test]
  fn load_reads_specification_directories() {
    let temp = tempfile::TempDir::new().unwrap();
    let specs = temp.path().join("specifications");
    fs::create_dir_all(&specs).unwrap();
    fs::write(specs.join("rake-13.0.6.gemspec"), "s.name = \"rake\"\ns.version = \"13.0.6\"\n").unwrap();
    fs::write(specs.join("broken.gemspec"), "s.version = \"1.0\"\n").unwrap();
    fs::write(specs.join("README"), "not a spec").unwrap();

    let missing = temp.path().join("missing");
    let repo = FsGemRepository::load(&[temp.path().to_path_buf(), missing]);
    assert_eq!(repo.specs().len(), 1);
    let rake = repo.find("rake", &Requirement::any()).unwrap();
    assert_eq!(rake.base_dir.as_deref(), Some(temp.path()));
  }
}
