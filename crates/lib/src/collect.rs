//! Discovery of the application files that go into an archive.
//!
//! Files are gathered from the configured top-level directories plus the
//! explicit include patterns, filtered by the exclude patterns, and mapped to
//! archive paths through the `application` pathmaps.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::archive::EntrySource;
use crate::config::{Config, FilePattern};
use crate::pathmap::{PathMapTable, PathmapError, category};

#[derive(Debug, Error)]
pub enum CollectError {
  #[error("invalid glob pattern '{pattern}': {source}")]
  Glob {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("invalid regular expression '{pattern}': {source}")]
  Regex {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("failed to walk {}: {source}", path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error(transparent)]
  Pathmap(#[from] PathmapError),
}

const GLOB_OPTIONS: glob::MatchOptions = glob::MatchOptions {
  case_sensitive: true,
  require_literal_separator: true,
  require_literal_leading_dot: false,
};

enum Matcher {
  Literal(String),
  Glob(glob::Pattern),
  Regex(Regex),
}

/// Compiled include or exclude patterns.
pub struct PatternSet {
  matchers: Vec<Matcher>,
}

impl PatternSet {
  pub fn new(patterns: &[FilePattern]) -> Result<Self, CollectError> {
    let matchers = patterns.iter().map(compile).collect::<Result<Vec<_>, _>>()?;
    Ok(Self { matchers })
  }

  /// Whether a project-relative, `/`-separated path matches any pattern.
  ///
  /// A literal path also matches everything below it.
  pub fn is_match(&self, path: &str) -> bool {
    self.matchers.iter().any(|m| match m {
      Matcher::Literal(lit) => {
        path == lit || path.strip_prefix(lit.as_str()).is_some_and(|rest| rest.starts_with('/'))
      }
      Matcher::Glob(pattern) => pattern.matches_with(path, GLOB_OPTIONS),
      Matcher::Regex(re) => re.is_match(path),
    })
  }
}

fn compile(pattern: &FilePattern) -> Result<Matcher, CollectError> {
  match pattern {
    FilePattern::Glob(glob) => {
      let glob = glob.strip_prefix("./").unwrap_or(glob);
      if is_literal(glob) {
        Ok(Matcher::Literal(glob.trim_end_matches('/').to_string()))
      } else {
        glob::Pattern::new(glob).map(Matcher::Glob).map_err(|e| CollectError::Glob {
          pattern: glob.to_string(),
          source: e,
        })
      }
    }
    FilePattern::Regex { regex } => Regex::new(regex).map(Matcher::Regex).map_err(|e| CollectError::Regex {
      pattern: regex.clone(),
      source: e,
    }),
  }
}

fn is_literal(pattern: &str) -> bool {
  !pattern.contains(['*', '?', '['])
}

/// Join path components with `/` regardless of platform.
pub(crate) fn slash_path(path: &Path) -> String {
  path
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Gathers application files for one project.
pub struct FileCollector<'a> {
  project_dir: &'a Path,
  dirs: &'a [String],
  includes: &'a [FilePattern],
  excludes: PatternSet,
}

impl<'a> FileCollector<'a> {
  pub fn new(
    project_dir: &'a Path,
    dirs: &'a [String],
    includes: &'a [FilePattern],
    excludes: &[FilePattern],
  ) -> Result<Self, CollectError> {
    Ok(Self {
      project_dir,
      dirs,
      includes,
      excludes: PatternSet::new(excludes)?,
    })
  }

  /// A collector using the configured directories and patterns, with the
  /// built-in excludes appended to the configured ones.
  pub fn from_config(project_dir: &'a Path, config: &'a Config) -> Result<Self, CollectError> {
    let excludes = config.effective_excludes(project_dir);
    Self::new(project_dir, &config.dirs, &config.includes, &excludes)
  }

  /// Whether a project-relative path is excluded.
  pub fn is_excluded(&self, path: &str) -> bool {
    self.excludes.is_match(path)
  }

  /// Existing top-level directories, in configured order.
  ///
  /// Missing ones are reported and left out.
  pub fn existing_dirs(&self) -> Vec<&'a str> {
    self
      .dirs
      .iter()
      .filter(|d| {
        let exists = self.project_dir.join(d.as_str()).is_dir();
        if !exists {
          warn!(dir = %d, "application directory does not exist or is not a directory; skipping");
        }
        exists
      })
      .map(String::as_str)
      .collect()
  }

  /// Project-relative paths of every collected file and directory, sorted,
  /// excluding the top-level directories themselves.
  pub fn files(&self) -> Result<Vec<String>, CollectError> {
    let mut found = BTreeSet::new();

    for dir in self.existing_dirs() {
      self.walk(dir, &mut found)?;
    }

    for pattern in self.includes {
      self.expand_include(pattern, &mut found)?;
    }

    let files: Vec<String> = found.into_iter().filter(|f| !self.excludes.is_match(f)).collect();
    debug!(count = files.len(), "collected application files");
    Ok(files)
  }

  /// Archive entries for the application: a marker for each existing
  /// top-level directory followed by every collected file, all mapped
  /// through the `application` pathmaps.
  pub fn collect(&self, pathmaps: &PathMapTable) -> Result<Vec<(String, EntrySource)>, CollectError> {
    let mut entries = Vec::new();
    for dir in self.existing_dirs() {
      if self.excludes.is_match(dir) {
        continue;
      }
      let dest = pathmaps.apply(category::APPLICATION, dir)?;
      entries.push((normalize_dir_entry(&dest), EntrySource::Directory));
    }
    for file in self.files()? {
      let dest = pathmaps.apply(category::APPLICATION, &file)?;
      entries.push((dest, EntrySource::File(self.project_dir.join(&file))));
    }
    Ok(entries)
  }

  fn walk(&self, dir: &str, found: &mut BTreeSet<String>) -> Result<(), CollectError> {
    let root = self.project_dir.join(dir);
    let walker = WalkDir::new(&root)
      .follow_links(false)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
      let entry = entry.map_err(|e| CollectError::Walk {
        path: root.clone(),
        source: e,
      })?;
      if entry.depth() == 0 {
        continue;
      }
      if let Ok(rel) = entry.path().strip_prefix(self.project_dir) {
        found.insert(slash_path(rel));
      }
    }
    Ok(())
  }

  fn expand_include(&self, pattern: &FilePattern, found: &mut BTreeSet<String>) -> Result<(), CollectError> {
    let FilePattern::Glob(glob) = pattern else {
      // Regular expressions only make sense as filters.
      warn!(pattern = ?pattern, "regular expression includes are not supported; ignoring");
      return Ok(());
    };
    let glob = glob.strip_prefix("./").unwrap_or(glob);

    if is_literal(glob) {
      if self.project_dir.join(glob).exists() {
        found.insert(glob.trim_end_matches('/').to_string());
      } else {
        debug!(path = glob, "included file does not exist");
      }
      return Ok(());
    }

    let base = glob::Pattern::escape(&self.project_dir.to_string_lossy());
    let full = format!("{}/{}", base.trim_end_matches('/'), glob);
    let paths = glob::glob_with(&full, GLOB_OPTIONS).map_err(|e| CollectError::Glob {
      pattern: glob.to_string(),
      source: e,
    })?;
    for path in paths.flatten() {
      if let Ok(rel) = path.strip_prefix(self.project_dir) {
        found.insert(slash_path(rel));
      }
    }
    Ok(())
  }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
  name.to_string_lossy().starts_with('.')
}

/// Collapse the `/.` left behind when the project root itself is mapped.
fn normalize_dir_entry(dest: &str) -> String {
  match dest {
    "." | "./" => String::new(),
    _ => dest.strip_suffix("/.").unwrap_or(dest).to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, rel).unwrap();
  }

  fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn patterns_match_globs_literals_and_regexes() {
    let set = PatternSet::new(&[
      FilePattern::glob("**/*.log"),
      FilePattern::glob("config/database.yml"),
      FilePattern::glob("tmp/war"),
      FilePattern::regex("^vendor/cache/"),
    ])
    .unwrap();

    assert!(set.is_match("vendor/test.log"));
    assert!(set.is_match("production.log"));
    assert!(set.is_match("config/database.yml"));
    assert!(set.is_match("tmp/war/x.class"));
    assert!(set.is_match("vendor/cache/rake.gem"));
    assert!(!set.is_match("tmp/warbler.txt"));
    assert!(!set.is_match("config/database.yml.example"));
    assert!(!set.is_match("lib/app.rb"));
  }

  #[test]
  fn invalid_patterns_are_errors() {
    assert!(matches!(
      PatternSet::new(&[FilePattern::glob("lib/[")]),
      Err(CollectError::Glob { .. })
    ));
    assert!(matches!(
      PatternSet::new(&[FilePattern::regex("(")]),
      Err(CollectError::Regex { .. })
    ));
  }

  #[test]
  fn walks_dirs_and_skips_hidden_files() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "app/models/user.rb");
    touch(temp.path(), "app/.secret");
    touch(temp.path(), "lib/.git/config");
    touch(temp.path(), "lib/tasks.rb");

    let dirs = strings(&["app", "lib"]);
    let collector = FileCollector::new(temp.path(), &dirs, &[], &[]).unwrap();
    assert_eq!(
      collector.files().unwrap(),
      vec!["app/models", "app/models/user.rb", "lib/tasks.rb"]
    );
  }

  #[test]
  #[tracing_test::traced_test]
  fn missing_dirs_are_skipped_with_warning() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "lib/a.rb");
    let dirs = strings(&["app", "lib"]);
    let collector = FileCollector::new(temp.path(), &dirs, &[], &[]).unwrap();
    assert_eq!(collector.existing_dirs(), vec!["lib"]);
    assert!(logs_contain("application directory does not exist"));
  }

  #[test]
  fn exclude_wins_over_include() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "Rakefile");
    touch(temp.path(), "extra/notes.txt");
    touch(temp.path(), "extra/debug.log");
    touch(temp.path(), "lib/app.rb");

    let dirs = strings(&["lib"]);
    let includes = vec![FilePattern::glob("Rakefile"), FilePattern::glob("extra/*")];
    let excludes = vec![FilePattern::glob("**/*.log"), FilePattern::glob("Rakefile")];
    let collector = FileCollector::new(temp.path(), &dirs, &includes, &excludes).unwrap();
    assert_eq!(collector.files().unwrap(), vec!["extra/notes.txt", "lib/app.rb"]);
  }

  #[test]
  fn log_exclusion_only_drops_log_files() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "vendor/test.log");
    touch(temp.path(), "vendor/readme.txt");
    let dirs = strings(&["vendor"]);
    let excludes = vec![FilePattern::glob("**/*.log")];
    let collector = FileCollector::new(temp.path(), &dirs, &[], &excludes).unwrap();
    assert_eq!(collector.files().unwrap(), vec!["vendor/readme.txt"]);
  }

  #[test]
  fn collect_maps_through_application_pathmaps() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "app/controllers/home.rb");
    touch(temp.path(), "config/routes.rb");
    fs::create_dir_all(temp.path().join("lib")).unwrap();

    let mut pathmaps = PathMapTable::new();
    pathmaps.push(category::APPLICATION, "WEB-INF/%p");
    let dirs = strings(&["app", "config", "lib"]);
    let collector = FileCollector::new(temp.path(), &dirs, &[], &[]).unwrap();
    let entries = collector.collect(&pathmaps).unwrap();

    let dests: Vec<_> = entries.iter().map(|(d, _)| d.as_str()).collect();
    assert_eq!(
      dests,
      vec![
        "WEB-INF/app",
        "WEB-INF/config",
        "WEB-INF/lib",
        "WEB-INF/app/controllers",
        "WEB-INF/app/controllers/home.rb",
        "WEB-INF/config/routes.rb",
      ]
    );
    assert_eq!(entries[0].1, EntrySource::Directory);
    assert_eq!(entries[4].1, EntrySource::File(temp.path().join("app/controllers/home.rb")));
  }

  #[test]
  fn project_root_dir_maps_cleanly() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "bin/tool");
    touch(temp.path(), "lib/tool.rb");

    let mut pathmaps = PathMapTable::new();
    pathmaps.push(category::APPLICATION, "tool/%p");
    let dirs = strings(&["."]);
    let collector = FileCollector::new(temp.path(), &dirs, &[], &[]).unwrap();
    let entries = collector.collect(&pathmaps).unwrap();
    let dests: Vec<_> = entries.iter().map(|(d, _)| d.as_str()).collect();
    assert_eq!(dests, vec!["tool", "tool/bin", "tool/bin/tool", "tool/lib", "tool/lib/tool.rb"]);
  }

  #[test]
  fn excluded_top_level_dir_gets_no_marker() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "tmp/cache/page.html");
    touch(temp.path(), "lib/app.rb");

    let mut pathmaps = PathMapTable::new();
    pathmaps.push(category::APPLICATION, "WEB-INF/%p");
    let dirs = strings(&["lib", "tmp"]);
    let excludes = vec![FilePattern::glob("tmp")];
    let collector = FileCollector::new(temp.path(), &dirs, &[], &excludes).unwrap();
    let entries = collector.collect(&pathmaps).unwrap();
    let dests: Vec<_> = entries.iter().map(|(d, _)| d.as_str()).collect();
    assert_eq!(dests, vec!["WEB-INF/lib", "WEB-INF/lib/app.rb"]);
  }

  #[test]
  #[serial_test::serial]
  fn default_excludes_stop_at_path_segments() {
    let temp = TempDir::new().unwrap();
    temp_env::with_var("WARBLER_HOME", None::<&str>, || {
      let config = Config::default();
      let collector = FileCollector::from_config(temp.path(), &config).unwrap();
      assert!(collector.is_excluded("tmp/war"));
      assert!(collector.is_excluded("tmp/war/x.class"));
      assert!(collector.is_excluded("tmp/cache/assets/app.js"));
      assert!(!collector.is_excluded("tmp/warbler.txt"));
      assert!(!collector.is_excluded("tmp/cache_keys.rb"));
      assert!(!collector.is_excluded("tmp/war-old/x.class"));
    });
  }
}
