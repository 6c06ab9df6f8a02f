//! Ahead-of-time compilation of Ruby sources with `jrubyc`.
//!
//! Compilation runs the JRuby shipped with the application (its jars are on
//! the classpath) in a blocking `java` subprocess. Compiled classes land next
//! to their sources under names mangled the way JRuby's class loader expects.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

/// Sources per `jrubyc` invocation, keeping command lines within OS limits.
pub const CHUNK_SIZE: usize = 2500;

/// What replaces a compiled `.rb` file in the archive.
pub const LOADER_STUB: &str = "load __FILE__.sub(/\\.rb$/, '.class')";

#[derive(Debug, Error)]
pub enum CompileError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("jrubyc exited with {status}")]
  Failed { status: std::process::ExitStatus },

  #[error("failed to stage {} for compilation: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A `jrubyc` invocation template.
#[derive(Debug, Clone)]
pub struct JRubyCompiler {
  java: PathBuf,
  classpath: Vec<PathBuf>,
  bytecode_version: Option<String>,
  compat_version: Option<String>,
  options: Vec<String>,
}

impl JRubyCompiler {
  pub fn new(classpath: Vec<PathBuf>) -> Self {
    Self {
      java: PathBuf::from("java"),
      classpath,
      bytecode_version: None,
      compat_version: None,
      options: Vec::new(),
    }
  }

  /// Use a specific `java` executable.
  pub fn java(mut self, java: impl Into<PathBuf>) -> Self {
    self.java = java.into();
    self
  }

  pub fn bytecode_version(mut self, version: Option<String>) -> Self {
    self.bytecode_version = version;
    self
  }

  /// Ruby compatibility flag such as `1.9`, passed as `--1.9`.
  pub fn compat_version(mut self, version: Option<String>) -> Self {
    self.compat_version = version;
    self
  }

  pub fn options(mut self, options: Vec<String>) -> Self {
    self.options = options;
    self
  }

  /// Arguments for compiling one batch of sources.
  pub fn args(&self, sources: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-classpath".into());
    args.push(std::env::join_paths(&self.classpath).unwrap_or_default());
    if let Some(version) = &self.bytecode_version {
      args.push(format!("-Djava.specification.version={}", version).into());
    }
    args.push("org.jruby.Main".into());
    if let Some(compat) = &self.compat_version {
      args.push(format!("--{}", compat).into());
    }
    args.push("-S".into());
    args.push("jrubyc".into());
    args.extend(self.options.iter().map(OsString::from));
    args.extend(sources.iter().map(OsString::from));
    args
  }

  /// Compile `sources` (relative to `dir`) in batches of [`CHUNK_SIZE`].
  pub fn compile(&self, dir: &Path, sources: &[String]) -> Result<(), CompileError> {
    if sources.is_empty() {
      debug!("nothing to compile");
      return Ok(());
    }
    for chunk in sources.chunks(CHUNK_SIZE) {
      info!(files = chunk.len(), "compiling ruby sources");
      let status = Command::new(&self.java)
        .args(self.args(chunk))
        .current_dir(dir)
        .status()
        .map_err(|e| CompileError::Spawn {
          program: self.java.display().to_string(),
          source: e,
        })?;
      if !status.success() {
        return Err(CompileError::Failed { status });
      }
    }
    Ok(())
  }
}

/// The class file JRuby generates for a Ruby source path.
///
/// Every directory component and the base name are mangled into Java
/// identifiers and the extension becomes `.class`:
/// `lib/my-gem/version.rb` maps to `lib/my_minus_gem/version.class`.
pub fn mangle_path(path: &str) -> String {
  let (dir, file) = match path.rfind('/') {
    Some(idx) => (&path[..idx], &path[idx + 1..]),
    None => ("", path),
  };
  let base = match file.rfind('.') {
    Some(idx) if idx > 0 => &file[..idx],
    _ => file,
  };

  let mut parts: Vec<String> = dir
    .split('/')
    .filter(|p| !p.is_empty() && *p != ".")
    .map(mangle_identifier)
    .collect();
  parts.push(format!("{}.class", mangle_identifier(base)));
  parts.join("/")
}

/// Replace characters that are not valid in a Java identifier.
pub fn mangle_identifier(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut previous_replaced = false;
  for c in name.chars() {
    if c.is_ascii_alphanumeric() || c == '$' || c == '_' {
      out.push(c);
      previous_replaced = false;
    } else {
      if !previous_replaced {
        out.push('_');
      }
      out.push_str(&special_char_name(c));
      out.push('_');
      previous_replaced = true;
    }
  }
  out
}

fn special_char_name(c: char) -> String {
  let name = match c {
    '.' => "dot",
    '?' => "p",
    '!' => "b",
    '<' => "lt",
    '>' => "gt",
    '=' => "equal",
    '[' => "lbracket",
    ']' => "rbracket",
    '+' => "plus",
    '-' => "minus",
    '*' => "times",
    '/' => "div",
    '&' => "and",
    other => {
      let mut buf = [0u8; 4];
      return other.encode_utf8(&mut buf).bytes().map(|b| format!("{:02x}", b)).collect();
    }
  };
  name.to_string()
}

/// Swap a `.rb` extension for `.class`.
pub fn class_file_for(path: &str) -> String {
  match path.strip_suffix(".rb") {
    Some(stem) => format!("{}.class", stem),
    None => path.to_string(),
  }
}
