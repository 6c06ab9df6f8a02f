//! Gem projects described by a `.gemspec`.
//!
//! The project's gemspec decides what goes into the jar: its `files`, its
//! runtime dependencies and its executable. The top-level directory list is
//! cleared so only files the gemspec names are packaged.

use tracing::{debug, warn};

use super::{ArchiveContext, Project, Trait, TraitError, TraitKind, add_init_load_path, add_main_rb, first_bin_script};
use crate::archive::{EntrySource, FileManifest};
use crate::compile::mangle_path;
use crate::config::Config;
use crate::gems::GemSpec;
use crate::pathmap::category;

#[derive(Default)]
pub struct GemspecTrait {
  spec_file: Option<String>,
  spec: Option<GemSpec>,
}

impl GemspecTrait {
  fn load(project: &Project, spec_file: &str) -> Result<GemSpec, TraitError> {
    let path = project.path(spec_file);
    let mut spec = GemSpec::load(&path).map_err(|e| TraitError::Gemspec { path, source: e })?;
    if spec.files.is_empty() && !spec.file_globs.is_empty() {
      let mut files: Vec<String> = spec.file_globs.iter().flat_map(|g| project.glob(g)).collect();
      files.retain(|f| project.path(f).is_file());
      files.dedup();
      spec.files = files;
    }
    Ok(spec)
  }

  /// The project-relative script `main.rb` should load.
  fn executable(&self, project: &Project, config: &Config) -> Result<String, TraitError> {
    if let Some(exe) = &config.executable {
      return Ok(exe.clone());
    }
    if let Some(spec) = &self.spec {
      let named = spec.default_executable.as_ref().or(spec.executables.first());
      if let Some(exe) = named {
        return Ok(format!("{}/{}", spec.bindir, exe));
      }
    }
    let exe = first_bin_script(project).ok_or(TraitError::NoExecutable)?;
    warn!(
      gemspec = self.spec_file.as_deref().unwrap_or_default(),
      executable = %exe,
      "no default executable in gemspec; using the first bin script"
    );
    Ok(exe)
  }
}

impl Trait for GemspecTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::Gemspec
  }

  fn before_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    let Some(spec_file) = project.glob("*.gemspec").into_iter().next() else {
      return Ok(());
    };
    let spec = Self::load(project, &spec_file)?;
    debug!(gem = %spec.name, version = %spec.version, "packaging gem project");

    for dep in spec.runtime_dependencies() {
      config.gems.add_with_requirement(&dep.name, &dep.requirement.to_string());
    }
    config.dirs.clear();
    config.compiled_ruby_files = spec.files.iter().filter(|f| f.ends_with(".rb")).cloned().collect();

    self.spec_file = Some(spec_file);
    self.spec = Some(spec);
    Ok(())
  }

  fn after_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    if let Some(spec) = &self.spec {
      for path in &spec.require_paths {
        add_init_load_path(config, path)?;
      }
    }
    Ok(())
  }

  fn update_archive(&self, cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    if let Some(spec) = &self.spec {
      for file in &spec.files {
        let source = cx.project.path(file);
        if !source.exists() {
          return Err(TraitError::MissingSpecFile(source));
        }
        let key = cx.apply_pathmaps(category::APPLICATION, file)?;
        if files.contains(&key) {
          continue;
        }
        let entry = if source.is_dir() { EntrySource::Directory } else { EntrySource::File(source) };
        files.insert(key, entry);
      }
    }

    for file in &cx.config.compiled_ruby_files {
      let class_file = mangle_path(file);
      if !cx.project.path(&class_file).is_file() {
        continue;
      }
      cx.add_with_pathmaps(files, category::APPLICATION, &class_file)?;
    }

    let exe = self.executable(cx.project, cx.config)?;
    let bin_path = cx.apply_pathmaps(category::APPLICATION, &exe)?;
    add_main_rb(files, &bin_path, cx.config.executable_params.as_deref());
    Ok(())
  }
}
