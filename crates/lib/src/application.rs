//! The packaging run for one project.
//!
//! Loading an [`Application`] detects its traits, lets them set defaults,
//! evaluates `config/warble.lua`, and lets the traits finish the
//! configuration. The result can then be assembled and written out.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, Feature};
use crate::consts::CONFIG_FILE;
use crate::gems::{FsGemRepository, GemError, GemResolver, GemSpec};
use crate::jar::{self, AssembleError, Jar, STAGING_DIR};
use crate::lua::{LuaConfigError, evaluate_config};
use crate::lua::globals::ProjectInfo;
use crate::traits::{Project, TraitError, TraitKind, TraitSet};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("project directory {} is not accessible: {source}", path.display())]
  ProjectDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to remove {}: {source}", path.display())]
  Clean {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Config(#[from] LuaConfigError),

  #[error(transparent)]
  Trait(#[from] TraitError),

  #[error(transparent)]
  Gem(#[from] GemError),

  #[error(transparent)]
  Assemble(#[from] AssembleError),
}

/// A configured project, ready to package.
pub struct Application {
  project: Project,
  config: Config,
  traits: TraitSet,
}

impl Application {
  /// Configure the project rooted at `dir`.
  ///
  /// `config_file` is resolved against the project and defaults to
  /// `config/warble.lua`.
  pub fn load(dir: &Path, config_file: Option<&Path>) -> Result<Self, AppError> {
    let dir = dunce::canonicalize(dir).map_err(|e| AppError::ProjectDir {
      path: dir.to_path_buf(),
      source: e,
    })?;
    let mut config = Config::new(&dir);
    let mut project = Project::new(&dir, FsGemRepository::load(&config.gem_paths));

    let mut traits = TraitSet::for_project(&project)?;
    info!(traits = ?traits.kinds(), dir = %dir.display(), "configuring project");
    traits.before_configure(&project, &mut config)?;

    let config_path = dir.join(config_file.unwrap_or(Path::new(CONFIG_FILE)));
    let info = ProjectInfo::new(&dir, traits.kinds().iter().map(|k| k.name().to_string()).collect());
    let gem_paths = config.gem_paths.clone();
    let mut config = evaluate_config(&config_path, &info, config)?;
    if config.gem_paths != gem_paths {
      debug!(paths = ?config.gem_paths, "gem paths changed; reloading installed gems");
      project.set_repository(FsGemRepository::load(&config.gem_paths));
    }

    traits.after_configure(&project, &mut config)?;
    Ok(Self { project, config, traits })
  }

  pub fn project(&self) -> &Project {
    &self.project
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Turn on a feature after configuration, as requested on the command
  /// line.
  pub fn enable_feature(&mut self, feature: Feature) {
    if !self.config.has_feature(feature) {
      self.config.features.push(feature);
    }
  }

  pub fn traits(&self) -> Vec<TraitKind> {
    self.traits.kinds()
  }

  /// The gems to package, with their runtime dependencies when
  /// `gem_dependencies` is on.
  pub fn gems(&self) -> Result<Vec<GemSpec>, AppError> {
    let resolver = GemResolver::new(self.project.repository());
    Ok(resolver.resolve(&self.config.gems, self.config.gem_dependencies)?)
  }

  /// Compile (when enabled) and gather every archive entry.
  pub fn assemble(&self) -> Result<Jar, AppError> {
    let gems = self.gems()?;
    let mut jar = Jar::new();
    jar.compile(&self.project, &self.config, &gems)?;
    jar.apply(&self.project, &self.config, &self.traits, &gems)?;
    Ok(jar)
  }

  /// Assemble and write the archive, returning its path.
  pub fn build(&self) -> Result<PathBuf, AppError> {
    let mut jar = self.assemble()?;
    Ok(jar.create(self.project.dir(), &self.config)?)
  }

  pub fn archive_path(&self) -> PathBuf {
    jar::archive_path(self.project.dir(), &self.config)
  }

  /// Remove the archive and the compilation staging directory.
  ///
  /// Returns whether anything was removed.
  pub fn clean(&self) -> Result<bool, AppError> {
    let mut removed = false;
    let archive = self.archive_path();
    if archive.is_file() {
      fs::remove_file(&archive).map_err(|e| AppError::Clean {
        path: archive.clone(),
        source: e,
      })?;
      info!(path = %archive.display(), "removed archive");
      removed = true;
    }
    let staging = self.project.path(STAGING_DIR);
    if staging.is_dir() {
      fs::remove_dir_all(&staging).map_err(|e| AppError::Clean {
        path: staging.clone(),
        source: e,
      })?;
      removed = true;
    }
    Ok(removed)
  }
}
