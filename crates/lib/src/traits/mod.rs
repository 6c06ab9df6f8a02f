//! Project traits.
//!
//! A trait is a detected characteristic of the project being packaged (a
//! Rails app, a gem with a gemspec, a Bundler-managed project, ...). Each
//! detected trait gets to adjust the configuration before and after the
//! user's configuration block runs, and to add or rewrite archive entries
//! once the common files have been gathered.
//!
//! Traits declare requirements on other traits as groups of alternatives.
//! Every group needs at least one detected member, and every detected member
//! of a group runs before the requiring trait.

mod bundler;
mod compiled_gems;
mod gemspec;
mod jar;
mod jbundler;
mod merb;
mod nogemspec;
mod rack;
mod rails;
mod resolve;
mod war;

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::archive::{ArchiveError, EntrySource, FileManifest};
use crate::bundler::BundlerError;
use crate::config::Config;
use crate::gems::{FsGemRepository, GemRepository, GemSpec, Requirement, SpecParseError};
use crate::pathmap::{PathmapError, category, pathmap};

pub use resolve::order;

#[derive(Debug, Error)]
pub enum TraitError {
  #[error("trait {name} requires one of [{alternatives}], none of which apply to this project")]
  MissingRequirement { name: TraitKind, alternatives: String },

  #[error("trait requirements form a cycle")]
  Cycle,

  #[error("failed to read gemspec {}: {source}", path.display())]
  Gemspec {
    path: PathBuf,
    #[source]
    source: SpecParseError,
  },

  #[error("file listed in the gemspec does not exist: {}", .0.display())]
  MissingSpecFile(PathBuf),

  #[error("no executable script found in bin/")]
  NoExecutable,

  #[error("jbundler classpath {} not found; run `jruby -S jbundle install` first", .0.display())]
  ClasspathMissing(PathBuf),

  #[error("a support jar with the {0} launcher is required; set `support_jar` or WARBLER_HOME")]
  SupportJarMissing(&'static str),

  #[error("the executable feature requires `webserver_jar` to be configured")]
  WebServerMissing,

  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Bundler(#[from] BundlerError),

  #[error(transparent)]
  Pathmap(#[from] PathmapError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),
}

/// The catalog of known traits, in declaration order.
///
/// Declaration order breaks ties when ordering traits that do not depend on
/// each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TraitKind {
  Jar,
  War,
  Rails,
  Merb,
  Rack,
  Gemspec,
  NoGemspec,
  Bundler,
  JBundler,
  CompiledGems,
}

impl TraitKind {
  pub const ALL: [TraitKind; 10] = [
    TraitKind::Jar,
    TraitKind::War,
    TraitKind::Rails,
    TraitKind::Merb,
    TraitKind::Rack,
    TraitKind::Gemspec,
    TraitKind::NoGemspec,
    TraitKind::Bundler,
    TraitKind::JBundler,
    TraitKind::CompiledGems,
  ];

  pub fn name(self) -> &'static str {
    match self {
      TraitKind::Jar => "Jar",
      TraitKind::War => "War",
      TraitKind::Rails => "Rails",
      TraitKind::Merb => "Merb",
      TraitKind::Rack => "Rack",
      TraitKind::Gemspec => "Gemspec",
      TraitKind::NoGemspec => "NoGemspec",
      TraitKind::Bundler => "Bundler",
      TraitKind::JBundler => "JBundler",
      TraitKind::CompiledGems => "CompiledGems",
    }
  }

  /// Whether the trait applies to the project.
  pub fn detect(self, project: &Project) -> bool {
    match self {
      TraitKind::Jar => !TraitKind::War.detect(project),
      TraitKind::War => [TraitKind::Rails, TraitKind::Merb, TraitKind::Rack]
        .iter()
        .any(|t| t.detect(project)),
      TraitKind::Rails => project.exists("config/environment.rb"),
      TraitKind::Merb => project.exists("config/init.rb"),
      TraitKind::Rack => {
        !TraitKind::Rails.detect(project) && (project.exists("config.ru") || !project.glob("*/config.ru").is_empty())
      }
      TraitKind::Gemspec => TraitKind::Jar.detect(project) && !project.glob("*.gemspec").is_empty(),
      TraitKind::NoGemspec => TraitKind::Jar.detect(project) && !TraitKind::Gemspec.detect(project),
      TraitKind::Bundler => project.gemfile().is_file(),
      TraitKind::JBundler => project.jarfile().is_file(),
      TraitKind::CompiledGems => true,
    }
  }

  /// Requirement groups; each inner slice lists alternatives.
  pub fn requirements(self) -> &'static [&'static [TraitKind]] {
    match self {
      TraitKind::Rails | TraitKind::Merb | TraitKind::Rack => &[&[TraitKind::War]],
      TraitKind::Gemspec | TraitKind::NoGemspec => &[&[TraitKind::Jar]],
      TraitKind::Bundler | TraitKind::JBundler | TraitKind::CompiledGems => &[&[TraitKind::War, TraitKind::Jar]],
      TraitKind::Jar | TraitKind::War => &[],
    }
  }

  /// A fresh hook object for one configuration run.
  pub fn instantiate(self) -> Box<dyn Trait> {
    match self {
      TraitKind::Jar => Box::new(jar::JarTrait),
      TraitKind::War => Box::new(war::WarTrait),
      TraitKind::Rails => Box::new(rails::RailsTrait),
      TraitKind::Merb => Box::new(merb::MerbTrait),
      TraitKind::Rack => Box::new(rack::RackTrait),
      TraitKind::Gemspec => Box::new(gemspec::GemspecTrait::default()),
      TraitKind::NoGemspec => Box::new(nogemspec::NoGemspecTrait),
      TraitKind::Bundler => Box::new(bundler::BundlerTrait),
      TraitKind::JBundler => Box::new(jbundler::JBundlerTrait),
      TraitKind::CompiledGems => Box::new(compiled_gems::CompiledGemsTrait),
    }
  }
}

impl fmt::Display for TraitKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Every trait in the catalog that applies to the project, in declaration
/// order.
pub fn detect(project: &Project) -> Vec<TraitKind> {
  let detected: Vec<TraitKind> = TraitKind::ALL.into_iter().filter(|t| t.detect(project)).collect();
  debug!(traits = ?detected, "detected project traits");
  detected
}

/// Configuration and archive hooks of a trait.
pub trait Trait {
  fn kind(&self) -> TraitKind;

  /// Runs before the user's configuration block.
  fn before_configure(&mut self, _project: &Project, _config: &mut Config) -> Result<(), TraitError> {
    Ok(())
  }

  /// Runs after the user's configuration block.
  fn after_configure(&mut self, _project: &Project, _config: &mut Config) -> Result<(), TraitError> {
    Ok(())
  }

  /// Adds or rewrites archive entries once the common files are gathered.
  fn update_archive(&self, _cx: &ArchiveContext<'_>, _files: &mut FileManifest) -> Result<(), TraitError> {
    Ok(())
  }
}

/// The detected traits of a project, instantiated and ordered.
pub struct TraitSet {
  traits: Vec<Box<dyn Trait>>,
}

impl TraitSet {
  /// Detect, order and instantiate the traits of a project.
  pub fn for_project(project: &Project) -> Result<Self, TraitError> {
    Self::from_kinds(&detect(project))
  }

  pub fn from_kinds(kinds: &[TraitKind]) -> Result<Self, TraitError> {
    let ordered = order(kinds)?;
    Ok(Self {
      traits: ordered.into_iter().map(TraitKind::instantiate).collect(),
    })
  }

  pub fn kinds(&self) -> Vec<TraitKind> {
    self.traits.iter().map(|t| t.kind()).collect()
  }

  pub fn before_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    for t in &mut self.traits {
      debug!(trait_name = %t.kind(), "before configure");
      t.before_configure(project, config)?;
    }
    Ok(())
  }

  pub fn after_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    for t in &mut self.traits {
      debug!(trait_name = %t.kind(), "after configure");
      t.after_configure(project, config)?;
    }
    Ok(())
  }

  pub fn update_archive(&self, cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    for t in &self.traits {
      debug!(trait_name = %t.kind(), "update archive");
      t.update_archive(cx, files)?;
    }
    Ok(())
  }
}

/// The project being packaged: its root directory and installed gems.
pub struct Project {
  dir: PathBuf,
  repository: FsGemRepository,
}

impl Project {
  pub fn new(dir: impl Into<PathBuf>, repository: FsGemRepository) -> Self {
    Self {
      dir: dir.into(),
      repository,
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn repository(&self) -> &FsGemRepository {
    &self.repository
  }

  /// Replace the installed gem repository, e.g. after `gem_paths` changed.
  pub fn set_repository(&mut self, repository: FsGemRepository) {
    self.repository = repository;
  }

  /// Resolve a project-relative (or absolute) path.
  pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
    self.dir.join(rel)
  }

  pub fn exists(&self, rel: &str) -> bool {
    self.path(rel).exists()
  }

  pub fn is_dir(&self, rel: &str) -> bool {
    self.path(rel).is_dir()
  }

  /// Project-relative paths matching a glob, sorted.
  pub fn glob(&self, pattern: &str) -> Vec<String> {
    let base = glob::Pattern::escape(&self.dir.to_string_lossy());
    let Ok(paths) = glob::glob(&format!("{}/{}", base.trim_end_matches('/'), pattern)) else {
      return Vec::new();
    };
    let mut out: Vec<String> = paths
      .flatten()
      .filter_map(|p| p.strip_prefix(&self.dir).ok().map(crate::collect::slash_path))
      .collect();
    out.sort();
    out
  }

  /// The Gemfile, honouring `BUNDLE_GEMFILE`.
  pub fn gemfile(&self) -> PathBuf {
    match env::var_os("BUNDLE_GEMFILE").filter(|v| !v.is_empty()) {
      Some(path) => self.path(PathBuf::from(path)),
      None => self.path("Gemfile"),
    }
  }

  /// The Jarfile, honouring `JBUNDLE_JARFILE`.
  pub fn jarfile(&self) -> PathBuf {
    match env::var_os("JBUNDLE_JARFILE").filter(|v| !v.is_empty()) {
      Some(path) => self.path(PathBuf::from(path)),
      None => self.path("Jarfile"),
    }
  }

  /// Jars shipped in the `lib` directory of an installed gem whose file
  /// names start with one of `prefixes`.
  ///
  /// Returns nothing, with a warning, when the gem is not installed.
  pub fn gem_jars(&self, gem: &str, prefixes: &[&str]) -> Vec<PathBuf> {
    let Some(spec) = self.repository.find(gem, &Requirement::any()) else {
      warn!(gem, "gem providing runtime jars is not installed");
      return Vec::new();
    };
    let Some(lib) = spec.full_gem_path().map(|p| p.join("lib")) else {
      return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(&lib) else {
      warn!(gem, path = %lib.display(), "gem has no lib directory");
      return Vec::new();
    };
    let mut jars: Vec<PathBuf> = entries
      .filter_map(Result::ok)
      .map(|e| e.path())
      .filter(|p| {
        let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        name.ends_with(".jar") && prefixes.iter().any(|prefix| name.starts_with(prefix))
      })
      .collect();
    jars.sort();
    jars
  }

  /// The JRuby core and stdlib jars from the `jruby-jars` gem.
  pub fn jruby_jars(&self) -> Vec<PathBuf> {
    self.gem_jars("jruby-jars", &["jruby-core", "jruby-stdlib"])
  }
}

/// What traits can see while updating the archive.
pub struct ArchiveContext<'a> {
  pub project: &'a Project,
  pub config: &'a Config,
  /// The gems being packaged.
  pub gems: &'a [GemSpec],
}

impl ArchiveContext<'_> {
  pub fn apply_pathmaps(&self, category: &str, path: &str) -> Result<String, PathmapError> {
    self.config.pathmaps.apply(category, path)
  }

  /// Add a project file under the archive path its category maps it to.
  pub fn add_with_pathmaps(&self, files: &mut FileManifest, category: &str, path: &str) -> Result<(), PathmapError> {
    let dest = self.apply_pathmaps(category, path)?;
    files.insert(dest, EntrySource::File(self.project.path(path)));
    Ok(())
  }
}

/// Point the gem pathmaps and `webxml.gem.path` at a user-chosen gem path.
pub(crate) fn update_gem_path(config: &mut Config, default_gem_path: &str) {
  if config.gem_path == default_gem_path {
    return;
  }
  if !config.gem_path.starts_with('/') {
    config.gem_path = format!("/{}", config.gem_path);
  }
  let from = default_gem_path.trim_start_matches('/').to_string();
  let to = config.relative_gem_path().to_string();
  for cat in [category::GEMSPECS, category::GEMS] {
    if let Some(patterns) = config.pathmaps.get_mut(cat) {
      for p in patterns.iter_mut() {
        *p = p.replacen(&from, &to, 1);
      }
    }
  }
  let gem_path = config.gem_path.clone();
  config.set_webxml(&["gem", "path"], gem_path);
}

/// Pathmaps for the gem categories under the configured gem path.
pub(crate) fn gem_pathmaps(config: &mut Config) {
  let gem_path = config.relative_gem_path().to_string();
  config
    .pathmaps
    .set(category::GEMSPECS, vec![format!("{}/specifications/%f", gem_path)]);
  config.pathmaps.set(category::GEMS, vec![format!("{}/gems/%p", gem_path)]);
}

/// Add a `$LOAD_PATH` entry for a project directory, mapped the way the
/// application files are.
pub(crate) fn add_init_load_path(config: &mut Config, dir: &str) -> Result<(), PathmapError> {
  let mut path = dir.to_string();
  if let Some(patterns) = config.pathmaps.get(category::APPLICATION) {
    for p in patterns {
      path = pathmap(&path, p)?;
    }
  }
  if !config.load_paths.contains(&path) {
    config.load_paths.push(path);
  }
  Ok(())
}

/// Write `META-INF/main.rb`, which loads `bin_path` when the jar is run.
pub(crate) fn add_main_rb(files: &mut FileManifest, bin_path: &str, params: Option<&str>) {
  let mut script = String::new();
  if let Some(params) = params {
    let args: Vec<String> = params.split_whitespace().map(|a| format!("'{}'", a)).collect();
    script.push_str(&format!("ARGV.unshift({})\n", args.join(", ")));
  }
  script.push_str(&format!("load '{}'", bin_path));
  files.insert("META-INF/main.rb", EntrySource::blob(script));
}

/// The first script in the project's `bin/` directory.
pub(crate) fn first_bin_script(project: &Project) -> Option<String> {
  project.glob("bin/*").into_iter().find(|p| project.path(p).is_file())
}
