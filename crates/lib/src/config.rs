//! The assembly configuration.
//!
//! A [`Config`] is created once per invocation, mutated by trait hooks and
//! the project's `config/warble.lua`, then treated as read-only while files
//! are collected and the archive is written. It round-trips through serde so
//! the Lua user block can edit it as a plain table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{HOME_ENV, INIT_FILENAME, TOP_DIRS};
use crate::gems::{GemSpecSet, default_gem_paths};
use crate::pathmap::PathMapTable;

/// A path pattern used by include and exclude lists.
///
/// Strings are globs (`lib/**/*.rb`) or literal paths; tables with a
/// `regex` key are regular expressions matched against the project-relative
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilePattern {
  Glob(String),
  Regex { regex: String },
}

impl FilePattern {
  pub fn glob(pattern: impl Into<String>) -> Self {
    FilePattern::Glob(pattern.into())
  }

  pub fn regex(pattern: impl Into<String>) -> Self {
    FilePattern::Regex { regex: pattern.into() }
  }
}

/// Optional assembly features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
  /// Compile Ruby sources to JVM bytecode with jrubyc.
  Compiled,
  /// Pack gem files into a nested `gems.jar`.
  Gemjar,
  /// Make a war runnable with `java -jar`.
  Executable,
}

/// Built-in init script fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitTemplate {
  Jar,
  War,
  Rails,
  Rack,
  #[serde(rename = "jbundler")]
  JBundler,
}

/// One piece of the generated `META-INF/init.rb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitFragment {
  /// Literal Ruby source.
  Text(String),
  /// A project file, copied verbatim (or expanded when it ends in `.erb`).
  File(PathBuf),
  /// A fragment rendered from the current configuration.
  Template(InitTemplate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Top-level project directories copied into the archive.
  pub dirs: Vec<String>,
  /// Extra files to add beyond `dirs`.
  pub includes: Vec<FilePattern>,
  /// Files to leave out; always wins over `includes`.
  pub excludes: Vec<FilePattern>,
  /// Exclude `**/*.log` in addition to `excludes`.
  pub exclude_logs: bool,
  pub java_libs: Vec<PathBuf>,
  pub java_classes: Vec<PathBuf>,
  /// Glob patterns for static files placed at the root of a war.
  pub public_html: Vec<String>,
  /// Files placed in `WEB-INF`; `.erb` files are expanded.
  pub webinf_files: Vec<PathBuf>,
  /// Files copied into `META-INF` by basename.
  pub script_files: Vec<PathBuf>,
  pub gems: GemSpecSet,
  /// Also package the runtime dependencies of `gems`.
  pub gem_dependencies: bool,
  /// Regular expressions of gem-relative paths to leave out.
  pub gem_excludes: Vec<String>,
  /// Location of the packaged gems inside the archive.
  pub gem_path: String,
  /// Installed gem directories to resolve gems from.
  pub gem_paths: Vec<PathBuf>,
  pub pathmaps: PathMapTable,
  pub features: Vec<Feature>,
  pub jar_name: String,
  pub jar_extension: String,
  /// Directory the finished archive is written to.
  pub autodeploy_dir: Option<PathBuf>,
  /// Values injected into `web.xml` as context parameters.
  pub webxml: BTreeMap<String, Value>,
  pub init_filename: String,
  pub init_contents: Vec<InitFragment>,
  /// Point `GEM_HOME` at the packaged gems even when already set.
  pub override_gem_home: bool,
  /// Archive paths prepended to `$LOAD_PATH` by the init script.
  pub load_paths: Vec<String>,
  pub manifest_file: Option<PathBuf>,
  pub compiled_ruby_files: Vec<String>,
  pub compile_gems: bool,
  /// Target bytecode version passed to jrubyc.
  pub bytecode_version: Option<String>,
  pub jrubyc_options: Vec<String>,
  /// Script run by `java -jar`; traits supply a default.
  pub executable: Option<String>,
  /// Arguments passed to `executable`.
  pub executable_params: Option<String>,
  pub bundler: bool,
  pub bundle_without: Vec<String>,
  pub jbundler: bool,
  /// Jar holding the `JarMain` and `WarMain` launcher classes.
  pub support_jar: Option<PathBuf>,
  /// Embedded web server bundled by the `executable` feature.
  pub webserver_jar: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      dirs: TOP_DIRS.iter().map(|d| d.to_string()).collect(),
      includes: Vec::new(),
      excludes: Vec::new(),
      exclude_logs: true,
      java_libs: Vec::new(),
      java_classes: Vec::new(),
      public_html: Vec::new(),
      webinf_files: Vec::new(),
      script_files: Vec::new(),
      gems: GemSpecSet::new(),
      gem_dependencies: true,
      gem_excludes: Vec::new(),
      gem_path: "/WEB-INF/gems".to_string(),
      gem_paths: Vec::new(),
      pathmaps: PathMapTable::new(),
      features: Vec::new(),
      jar_name: String::new(),
      jar_extension: "jar".to_string(),
      autodeploy_dir: None,
      webxml: BTreeMap::new(),
      init_filename: INIT_FILENAME.to_string(),
      init_contents: Vec::new(),
      override_gem_home: true,
      load_paths: Vec::new(),
      manifest_file: None,
      compiled_ruby_files: Vec::new(),
      compile_gems: false,
      bytecode_version: None,
      jrubyc_options: Vec::new(),
      executable: None,
      executable_params: None,
      bundler: false,
      bundle_without: vec!["development".to_string(), "test".to_string()],
      jbundler: false,
      support_jar: None,
      webserver_jar: None,
    }
  }
}

impl Config {
  /// Defaults for a project rooted at `project_dir`.
  ///
  /// The archive is named after the directory, gems are resolved from
  /// `GEM_HOME`/`GEM_PATH`, and the launcher jar is looked up under
  /// `WARBLER_HOME` when that is set.
  pub fn new(project_dir: &Path) -> Self {
    let jar_name = project_dir
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "app".to_string());
    let support_jar = installation_dir()
      .map(|home| home.join("lib").join("warbler_jar.jar"))
      .filter(|p| p.is_file());
    Self {
      jar_name,
      gem_paths: default_gem_paths(),
      support_jar,
      ..Self::default()
    }
  }

  pub fn has_feature(&self, feature: Feature) -> bool {
    self.features.contains(&feature)
  }

  /// `gem_path` without its leading slash, as used in archive paths.
  pub fn relative_gem_path(&self) -> &str {
    self.gem_path.trim_start_matches('/')
  }

  /// Archive file name, `<jar_name>.<jar_extension>`.
  pub fn archive_file_name(&self) -> String {
    format!("{}.{}", self.jar_name, self.jar_extension)
  }

  /// Set a nested `webxml` value, creating intermediate tables.
  pub fn set_webxml(&mut self, path: &[&str], value: impl Into<Value>) {
    let Some((first, rest)) = path.split_first() else {
      return;
    };
    let entry = self.webxml.entry(first.to_string()).or_insert(Value::Null);
    set_nested(entry, rest, value.into());
  }

  /// Look up a nested `webxml` value.
  pub fn webxml_value(&self, path: &[&str]) -> Option<&Value> {
    let (first, rest) = path.split_first()?;
    let mut value = self.webxml.get(*first)?;
    for key in rest {
      value = value.get(*key)?;
    }
    Some(value)
  }

  /// The `webxml.booter` setting, if any.
  pub fn booter(&self) -> Option<&str> {
    self.webxml.get("booter").and_then(Value::as_str)
  }

  /// User excludes followed by the built-in ones.
  ///
  /// The built-in excludes drop the staging and cache directories under
  /// `tmp/`, the tool's own installation directory when it lies inside the
  /// project, and log files unless `exclude_logs` is off.
  pub fn effective_excludes(&self, project_dir: &Path) -> Vec<FilePattern> {
    let mut excludes = self.excludes.clone();
    excludes.push(FilePattern::regex("^tmp/(war|cache)(/|$)"));
    if let Some(home) = installation_dir()
      && let Some(rel) = relative_inside(project_dir, &home)
    {
      excludes.push(FilePattern::glob(format!("{}/**/*", rel)));
    }
    if self.exclude_logs {
      excludes.push(FilePattern::glob("**/*.log"));
    }
    excludes
  }
}

fn set_nested(target: &mut Value, path: &[&str], value: Value) {
  let Some((first, rest)) = path.split_first() else {
    *target = value;
    return;
  };
  if !target.is_object() {
    *target = Value::Object(Default::default());
  }
  if let Value::Object(map) = target {
    let entry = map.entry(first.to_string()).or_insert(Value::Null);
    set_nested(entry, rest, value);
  }
}

/// The tool's installation directory from `WARBLER_HOME`.
pub fn installation_dir() -> Option<PathBuf> {
  std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// `path` relative to `base` with `/` separators, when it lies inside it.
fn relative_inside(base: &Path, path: &Path) -> Option<String> {
  let base = dunce::canonicalize(base).ok()?;
  let path = dunce::canonicalize(path).ok()?;
  let rel = path.strip_prefix(&base).ok()?;
  if rel.as_os_str().is_empty() {
    return None;
  }
  Some(
    rel
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/"),
  )
}
