//! Executable jar packaging.

use tracing::info;

use super::{ArchiveContext, Project, Trait, TraitError, TraitKind, gem_pathmaps, update_gem_path};
use crate::archive::{EntrySource, FileManifest, default_manifest, read_entry};
use crate::config::{Config, InitFragment, InitTemplate};
use crate::consts::MANIFEST_ENTRY;
use crate::pathmap::category;

pub(crate) const DEFAULT_GEM_PATH: &str = "/META-INF/gems";

pub struct JarTrait;

impl Trait for JarTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::Jar
  }

  fn before_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.gem_path = DEFAULT_GEM_PATH.to_string();
    config.pathmaps.set(category::JAVA_LIBS, vec!["META-INF/lib/%f".to_string()]);
    config.pathmaps.set(category::JAVA_CLASSES, vec!["%p".to_string()]);
    config
      .pathmaps
      .set(category::APPLICATION, vec![format!("{}/%p", config.jar_name)]);
    gem_pathmaps(config);
    config.java_libs = project.jruby_jars();
    Ok(())
  }

  fn after_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    update_gem_path(config, DEFAULT_GEM_PATH);
    config.init_contents.push(InitFragment::Template(InitTemplate::Jar));
    Ok(())
  }

  fn update_archive(&self, cx: &ArchiveContext<'_>, files: &mut FileManifest) -> Result<(), TraitError> {
    if cx.config.manifest_file.is_some() {
      return Ok(());
    }
    let Some(support_jar) = &cx.config.support_jar else {
      info!("no support jar configured; the jar will not be directly executable");
      return Ok(());
    };
    let class = read_entry(support_jar, "JarMain.class")?;
    files.insert("JarMain.class", EntrySource::blob(class));
    files.insert(MANIFEST_ENTRY, EntrySource::blob(default_manifest(Some("JarMain"))));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gems::FsGemRepository;
  use crate::util::testutil::support_jar;
  use tempfile::TempDir;

  fn configured(jar_name: &str) -> (TempDir, Project, Config) {
    let temp = TempDir::new().unwrap();
    let project = Project::new(temp.path(), FsGemRepository::default());
    let mut config = Config::default();
    config.jar_name = jar_name.to_string();
    let mut t = JarTrait;
    t.before_configure(&project, &mut config).unwrap();
    (temp, project, config)
  }

  #[test]
  fn jar_layout_pathmaps() {
    let (_temp, _project, config) = configured("tool");
    assert_eq!(config.gem_path, "/META-INF/gems");
    assert_eq!(config.pathmaps.apply(category::APPLICATION, "lib/tool.rb").unwrap(), "tool/lib/tool.rb");
    assert_eq!(
      config.pathmaps.apply(category::JAVA_LIBS, "/opt/jars/jruby-core.jar").unwrap(),
      "META-INF/lib/jruby-core.jar"
    );
    assert_eq!(
      config.pathmaps.apply(category::GEMS, "rake-13.0.6/lib/rake.rb").unwrap(),
      "META-INF/gems/gems/rake-13.0.6/lib/rake.rb"
    );
    assert_eq!(
      config.pathmaps.apply(category::GEMSPECS, "/home/gems/specifications/rake-13.0.6.gemspec").unwrap(),
      "META-INF/gems/specifications/rake-13.0.6.gemspec"
    );
  }

  #[test]
  fn after_configure_adds_init_template() {
    let (_temp, project, mut config) = configured("tool");
    config.gem_path = "/META-INF/vendor".to_string();
    JarTrait.after_configure(&project, &mut config).unwrap();
    assert_eq!(config.init_contents, vec![InitFragment::Template(InitTemplate::Jar)]);
    assert_eq!(
      config.pathmaps.get(category::GEMS).unwrap(),
      ["META-INF/vendor/gems/%p"]
    );
  }

  #[test]
  fn support_jar_makes_the_jar_executable() {
    let (temp, project, mut config) = configured("tool");
    config.support_jar = Some(support_jar(temp.path()));
    let cx = ArchiveContext {
      project: &project,
      config: &config,
      gems: &[],
    };
    let mut files = FileManifest::new();
    JarTrait.update_archive(&cx, &mut files).unwrap();

    assert!(files.contains("JarMain.class"));
    let manifest = String::from_utf8(files.contents(MANIFEST_ENTRY).unwrap().unwrap()).unwrap();
    assert!(manifest.contains("Main-Class: JarMain\n"));
  }

  #[test]
  fn custom_manifest_is_left_alone() {
    let (temp, project, mut config) = configured("tool");
    config.support_jar = Some(support_jar(temp.path()));
    config.manifest_file = Some(temp.path().join("MANIFEST.MF"));
    let cx = ArchiveContext {
      project: &project,
      config: &config,
      gems: &[],
    };
    let mut files = FileManifest::new();
    JarTrait.update_archive(&cx, &mut files).unwrap();
    assert!(files.is_empty());
  }
}
