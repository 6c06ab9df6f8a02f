//! Web application archive packaging.
//!
//! A war keeps the application under `WEB-INF/`, static files from
//! `public/` at the archive root, and a deployment descriptor generated from
//! the `webxml` settings unless the project ships its own.

use std::env;
use std::path::PathBuf;

use tracing::debug;

use super::{ArchiveContext, Project, Trait, TraitError, TraitKind, gem_pathmaps, update_gem_path};
use crate::archive::{EntrySource, FileManifest, default_manifest, read_entry};
use crate::config::{Config, Feature, InitFragment, InitTemplate};
use crate::consts::MANIFEST_ENTRY;
use crate::pathmap::category;
use crate::webxml;

pub(crate) const DEFAULT_GEM_PATH: &str = "/WEB-INF/gems";

/// Where the `executable` feature places the embedded web server.
pub const WEBSERVER_ENTRY: &str = "WEB-INF/webserver.jar";

const WEB_XML_ENTRY: &str = "WEB-INF/web.xml";

pub struct WarTrait;

impl WarTrait {
  fn default_pathmaps(config: &mut Config) {
    let maps = [
      (category::PUBLIC_HTML, "%{public/,}p"),
      (category::JAVA_LIBS, "WEB-INF/lib/%f"),
      (category::JAVA_CLASSES, "WEB-INF/classes/%p"),
      (category::APPLICATION, "WEB-INF/%p"),
      (category::WEBINF, "WEB-INF/%{.erb$,}f"),
    ];
    for (cat, pattern) in maps {
      config.pathmaps.set(cat, vec![pattern.to_string()]);
    }
    gem_pathmaps(config);
  }

  fn default_webxml(config: &mut Config) {
    let rails_env = env::var("RAILS_ENV").unwrap_or_else(|_| "production".to_string());
    config.webxml.clear();
    config.set_webxml(&["rails", "env"], rails_env);
    config.set_webxml(&["public", "root"], "/");
    config.set_webxml(&["ignored"], vec!["jndi", "booter"]);
  }

  fn default_webinf_files(project: &Project) -> Vec<PathBuf> {
    ["config/web.xml", "config/web.xml.erb"]
      .into_iter()
      .find(|f| project.exists(f))
      .map(|f| vec![PathBuf::from(f)])
      .unwrap_or_default()
  }

  fn add_public_files(cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    for pattern in &cx.config.public_html {
      for path in cx.project.glob(pattern) {
        if cx.project.path(&path).is_dir() {
          files.insert(cx.apply_pathmaps(category::PUBLIC_HTML, &path)?, EntrySource::Directory);
        } else {
          cx.add_with_pathmaps(files, category::PUBLIC_HTML, &path)?;
        }
      }
    }
    Ok(())
  }

  fn add_webxml(cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    for file in &cx.config.webinf_files {
      let rel = crate::collect::slash_path(file);
      let dest = cx.apply_pathmaps(category::WEBINF, &rel)?;
      let full = cx.project.path(file);
      if rel.ends_with(".erb") {
        let template = std::fs::read_to_string(&full).map_err(|e| TraitError::Io { path: full, source: e })?;
        files.insert(dest, EntrySource::blob(webxml::expand_template(&template, cx.config)));
      } else {
        files.insert(dest, EntrySource::File(full));
      }
    }
    if !files.contains(WEB_XML_ENTRY) {
      debug!("generating web.xml");
      files.insert(WEB_XML_ENTRY, EntrySource::blob(webxml::render(cx.config)));
    }
    Ok(())
  }

  fn add_executables(cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    let webserver = cx.config.webserver_jar.as_ref().ok_or(TraitError::WebServerMissing)?;
    let support_jar = cx
      .config
      .support_jar
      .as_ref()
      .ok_or(TraitError::SupportJarMissing("WarMain"))?;
    let class = read_entry(support_jar, "WarMain.class")?;
    files.insert(MANIFEST_ENTRY, EntrySource::blob(default_manifest(Some("WarMain"))));
    files.insert("WarMain.class", EntrySource::blob(class));
    files.insert(WEBSERVER_ENTRY, EntrySource::File(cx.project.path(webserver)));
    Ok(())
  }
}

impl Trait for WarTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::War
  }

  fn before_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.gem_path = DEFAULT_GEM_PATH.to_string();
    Self::default_pathmaps(config);
    Self::default_webxml(config);
    config.webinf_files = Self::default_webinf_files(project);
    let mut java_libs = project.jruby_jars();
    java_libs.extend(project.gem_jars("jruby-rack", &["jruby-rack"]));
    config.java_libs = java_libs;
    config.public_html = vec!["public/**/*".to_string()];
    config.jar_extension = "war".to_string();
    Ok(())
  }

  fn after_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    update_gem_path(config, DEFAULT_GEM_PATH);
    config.init_contents.push(InitFragment::Template(InitTemplate::War));
    Ok(())
  }

  fn update_archive(&self, cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    Self::add_public_files(cx, files)?;
    Self::add_webxml(cx, files)?;
    if cx.config.has_feature(Feature::Executable) {
      Self::add_executables(cx, files)?;
    }
    Ok(())
  }
}
