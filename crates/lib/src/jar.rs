//! Archive assembly.
//!
//! A [`Jar`] gathers everything that goes into the archive in a
//! [`FileManifest`], in a fixed order where later steps overwrite earlier
//! ones: application files, java libraries and classes, gems, the manifest,
//! the init script, script files, and finally the traits' own updates.
//! [`Jar::create`] then writes the zip.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::{ArchiveBuilder, ArchiveError, EntrySource, FileManifest, add_manifest};
use crate::collect::{CollectError, FileCollector, slash_path};
use crate::compile::{CompileError, JRubyCompiler, LOADER_STUB, class_file_for};
use crate::config::{Config, Feature};
use crate::gems::GemSpec;
use crate::init_script::{self, InitScriptError};
use crate::pathmap::{PathmapError, category};
use crate::traits::{ArchiveContext, Project, TraitError, TraitSet};

/// Where gem sources are copied for compilation, relative to the project.
pub const STAGING_DIR: &str = "tmp/war";

/// Name of the nested gem archive built by the `gemjar` feature.
pub const GEMJAR_NAME: &str = "gems.jar";

#[derive(Debug, Error)]
pub enum AssembleError {
  #[error(transparent)]
  Collect(#[from] CollectError),

  #[error(transparent)]
  Pathmap(#[from] PathmapError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Trait(#[from] TraitError),

  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error(transparent)]
  InitScript(#[from] InitScriptError),

  #[error("file listed in compiled_ruby_files does not exist: {}", .0.display())]
  MissingCompiledFile(PathBuf),

  #[error("invalid gem exclude pattern '{pattern}': {source}")]
  GemExclude {
    pattern: String,
    #[source]
    source: regex::Error,
  },
}

/// The contents of one archive.
#[derive(Debug, Default)]
pub struct Jar {
  files: FileManifest,
  /// Project-relative application sources compiled in place.
  compiled_sources: Vec<String>,
  /// Archive paths of gem sources compiled under [`STAGING_DIR`].
  compiled_gem_entries: Vec<String>,
}

impl Jar {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn files(&self) -> &FileManifest {
    &self.files
  }

  pub fn files_mut(&mut self) -> &mut FileManifest {
    &mut self.files
  }

  /// Compile Ruby sources with jrubyc when the `compiled` feature is on.
  ///
  /// Application sources default to every collected `.rb` file when
  /// `compiled_ruby_files` is empty. With `compile_gems`, gem sources are
  /// copied under [`STAGING_DIR`] and compiled there.
  pub fn compile(&mut self, project: &Project, config: &Config, gems: &[GemSpec]) -> Result<(), AssembleError> {
    if !config.has_feature(Feature::Compiled) {
      return Ok(());
    }
    let compiler = compiler_for(project, config);
    let collector = FileCollector::from_config(project.dir(), config)?;

    let sources: Vec<String> = if config.compiled_ruby_files.is_empty() {
      collector.files()?.into_iter().filter(|f| f.ends_with(".rb")).collect()
    } else {
      let listed: Vec<String> = config
        .compiled_ruby_files
        .iter()
        .filter(|f| !collector.is_excluded(f))
        .cloned()
        .collect();
      if let Some(missing) = listed.iter().find(|f| !project.path(f.as_str()).is_file()) {
        return Err(AssembleError::MissingCompiledFile(project.path(missing)));
      }
      listed
    };
    compiler.compile(project.dir(), &sources)?;
    self.compiled_sources = sources;

    if config.compile_gems {
      let staging = project.path(STAGING_DIR);
      let gem_files = gem_entries(config, gems)?;
      let mut staged = Vec::new();
      for (entry, source) in &gem_files {
        let EntrySource::File(path) = source else {
          continue;
        };
        if !entry.ends_with(".rb") {
          continue;
        }
        let target = staging.join(entry);
        if let Some(parent) = target.parent() {
          fs::create_dir_all(parent).map_err(|e| CompileError::Io {
            path: parent.to_path_buf(),
            source: e,
          })?;
        }
        fs::copy(path, &target).map_err(|e| CompileError::Io {
          path: path.clone(),
          source: e,
        })?;
        staged.push(entry.clone());
      }
      compiler.compile(&staging, &staged)?;
      self.compiled_gem_entries = staged;
    }
    Ok(())
  }

  /// Gather every archive entry for the configuration.
  pub fn apply(
    &mut self,
    project: &Project,
    config: &Config,
    traits: &TraitSet,
    gems: &[GemSpec],
  ) -> Result<(), AssembleError> {
    self.files = FileManifest::new();
    self.find_application_files(project, config)?;
    self.find_java_libs(project, config)?;
    self.find_java_classes(project, config)?;
    self.find_gem_files(project, config, gems)?;
    add_manifest(
      &mut self.files,
      config.manifest_file.as_ref().map(|p| project.path(p)).as_deref(),
    );
    self.add_init_file(project, config)?;
    self.add_script_files(project, config);

    let cx = ArchiveContext { project, config, gems };
    traits.update_archive(&cx, &mut self.files)?;

    if config.has_feature(Feature::Gemjar) {
      self.pack_gemjar(config)?;
    }
    debug!(entries = self.files.len(), "archive contents gathered");
    Ok(())
  }

  /// Write the archive to `<jar_name>.<jar_extension>`, inside
  /// `autodeploy_dir` when set, and return its path.
  pub fn create(&mut self, project_dir: &Path, config: &Config) -> Result<PathBuf, AssembleError> {
    let path = archive_path(project_dir, config);
    // A previous archive picked up from the project root must not nest itself.
    self
      .files
      .remove(&format!("{}/{}", config.jar_name, config.archive_file_name()));
    info!(path = %path.display(), "creating archive");
    ArchiveBuilder::new().write(&mut self.files, &path)?;
    Ok(path)
  }

  fn find_application_files(&mut self, project: &Project, config: &Config) -> Result<(), AssembleError> {
    let collector = FileCollector::from_config(project.dir(), config)?;
    for (dest, source) in collector.collect(&config.pathmaps)? {
      self.files.insert(dest, source);
    }
    for source in &self.compiled_sources {
      let dest = config.pathmaps.apply(category::APPLICATION, source)?;
      self.files.insert(dest, EntrySource::blob(LOADER_STUB));
    }
    Ok(())
  }

  fn find_java_libs(&mut self, project: &Project, config: &Config) -> Result<(), AssembleError> {
    for lib in &config.java_libs {
      let dest = config.pathmaps.apply(category::JAVA_LIBS, &lib.to_string_lossy())?;
      self.files.insert(dest, EntrySource::File(project.path(lib)));
    }
    Ok(())
  }

  fn find_java_classes(&mut self, project: &Project, config: &Config) -> Result<(), AssembleError> {
    for class in &config.java_classes {
      let dest = config.pathmaps.apply(category::JAVA_CLASSES, &slash_path(class))?;
      self.files.insert(dest, EntrySource::File(project.path(class)));
    }
    Ok(())
  }

  fn find_gem_files(&mut self, project: &Project, config: &Config, gems: &[GemSpec]) -> Result<(), AssembleError> {
    for (dest, source) in gem_entries(config, gems)? {
      self.files.insert(dest, source);
    }
    let staging = project.path(STAGING_DIR);
    for entry in &self.compiled_gem_entries {
      self.files.insert(entry.clone(), EntrySource::blob(LOADER_STUB));
      let class_entry = class_file_for(entry);
      self
        .files
        .insert(class_entry.clone(), EntrySource::File(staging.join(&class_entry)));
    }
    Ok(())
  }

  fn add_init_file(&mut self, project: &Project, config: &Config) -> Result<(), AssembleError> {
    if let Some(script) = init_script::render(project.dir(), config)? {
      self.files.insert(config.init_filename.clone(), EntrySource::blob(script));
    }
    Ok(())
  }

  fn add_script_files(&mut self, project: &Project, config: &Config) {
    for script in &config.script_files {
      let Some(name) = script.file_name() else {
        continue;
      };
      self.files.insert(
        format!("META-INF/{}", name.to_string_lossy()),
        EntrySource::File(project.path(script)),
      );
    }
  }

  /// Move every entry under the gem path into a nested jar placed with the
  /// java libraries.
  fn pack_gemjar(&mut self, config: &Config) -> Result<(), AssembleError> {
    let prefix = format!("{}/", config.relative_gem_path());
    let mut gem_files = self.files.extract(|path, _| path.starts_with(&prefix));
    if gem_files.is_empty() {
      warn!("gemjar feature enabled but no gems are packaged");
      return Ok(());
    }
    gem_files.rename_all(|path| path[prefix.len()..].to_string());
    let bytes = ArchiveBuilder::new().build(&mut gem_files)?;
    let dest = config.pathmaps.apply(category::JAVA_LIBS, GEMJAR_NAME)?;
    self.files.insert(dest, EntrySource::Blob(bytes));
    Ok(())
  }
}

/// Where [`Jar::create`] writes the archive.
pub fn archive_path(project_dir: &Path, config: &Config) -> PathBuf {
  let name = config.archive_file_name();
  match &config.autodeploy_dir {
    Some(dir) => project_dir.join(dir).join(name),
    None => project_dir.join(name),
  }
}

/// Specification and file entries for the packaged gems.
///
/// Files whose gem-relative path matches a `gem_excludes` expression are
/// left out.
pub fn gem_entries(config: &Config, gems: &[GemSpec]) -> Result<FileManifest, AssembleError> {
  let excludes = config
    .gem_excludes
    .iter()
    .map(|pattern| {
      Regex::new(pattern).map_err(|e| AssembleError::GemExclude {
        pattern: pattern.clone(),
        source: e,
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  let mut files = FileManifest::new();
  for spec in gems {
    let Some(gem_dir) = spec.full_gem_path().filter(|p| p.is_dir()) else {
      warn!(gem = %spec.name, "gem directory does not exist; skipping");
      continue;
    };
    let full_name = spec.full_name();

    if let Some(spec_file) = &spec.loaded_from {
      let dest = config
        .pathmaps
        .apply(category::GEMSPECS, &format!("{}.gemspec", full_name))?;
      files.insert(dest, EntrySource::File(spec_file.clone()));
    }

    let walker = WalkDir::new(&gem_dir).min_depth(1).sort_by_file_name();
    for entry in walker.into_iter().filter_map(Result::ok) {
      let Ok(rel) = entry.path().strip_prefix(&gem_dir) else {
        continue;
      };
      let rel = slash_path(rel);
      if excludes.iter().any(|re| re.is_match(&rel)) {
        continue;
      }
      let dest = config
        .pathmaps
        .apply(category::GEMS, &format!("{}/{}", full_name, rel))?;
      let source = if entry.file_type().is_dir() {
        EntrySource::Directory
      } else {
        EntrySource::File(entry.path().to_path_buf())
      };
      files.insert(dest, source);
    }
  }
  Ok(files)
}

fn compiler_for(project: &Project, config: &Config) -> JRubyCompiler {
  let classpath = config.java_libs.iter().map(|lib| project.path(lib)).collect();
  let compat = config.webxml_value(&["jruby", "compat", "version"]).map(|v| match v {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  });
  JRubyCompiler::new(classpath)
    .bytecode_version(config.bytecode_version.clone())
    .compat_version(compat)
    .options(config.jrubyc_options.clone())
}
