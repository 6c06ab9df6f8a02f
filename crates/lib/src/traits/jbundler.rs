//! JBundler-managed jar dependencies.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use regex::Regex;

use super::{Project, Trait, TraitError, TraitKind};
use crate::config::{Config, InitFragment, InitTemplate};

/// Classpath file written by `jbundle install`.
pub const CLASSPATH_FILE: &str = ".jbundler/classpath.rb";

pub struct JBundlerTrait;

/// Jar paths appended to `JBUNDLER_CLASSPATH` in a classpath file.
fn classpath_jars(source: &str) -> Vec<PathBuf> {
  let Ok(entry) = Regex::new(r#"JBUNDLER_CLASSPATH\s*<<\s*['"]([^'"]+)['"]"#) else {
    return Vec::new();
  };
  entry
    .captures_iter(source)
    .map(|caps| PathBuf::from(&caps[1]))
    .collect()
}

impl Trait for JBundlerTrait {
  fn kind(&self) -> TraitKind {
    TraitKind::JBundler
  }

  fn before_configure(&mut self, _project: &Project, config: &mut Config) -> Result<(), TraitError> {
    config.jbundler = true;
    Ok(())
  }

  fn after_configure(&mut self, project: &Project, config: &mut Config) -> Result<(), TraitError> {
    if !config.jbundler {
      return Ok(());
    }
    let classpath = project.path(CLASSPATH_FILE);
    if !classpath.is_file() {
      return Err(TraitError::ClasspathMissing(classpath));
    }
    let source = fs::read_to_string(&classpath).map_err(|e| TraitError::Io {
      path: classpath.clone(),
      source: e,
    })?;

    let mut libs = std::mem::take(&mut config.java_libs);
    libs.extend(project.jruby_jars());
    libs.extend(classpath_jars(&source));

    let mut seen: HashSet<OsString> = HashSet::new();
    libs.retain(|lib| seen.insert(lib.file_name().map(OsString::from).unwrap_or_default()));
    config.java_libs = libs;
    config.init_contents.push(InitFragment::Template(InitTemplate::JBundler));
    Ok(())
  }
}
