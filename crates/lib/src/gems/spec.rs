//! Gem specifications.
//!
//! Installed gems are described by the Ruby files Rubygems writes to
//! `<gem dir>/specifications/<name>-<version>.gemspec`. Those files follow
//! a fixed generated shape (`s.name = "rake".freeze`,
//! `s.add_runtime_dependency(%q<x>.freeze, [">= 1"])`, ...), so they are read
//! with a statement scanner that understands Ruby string and array literals
//! rather than by evaluating Ruby. Hand-written project gemspecs are read the
//! same way; `files` expressed as `Dir[...]` globs are kept as patterns.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::version::{GemVersion, Requirement, VersionError};

#[derive(Debug, Error)]
pub enum SpecParseError {
  #[error("gemspec has no literal name")]
  MissingName,

  #[error("gem '{name}': {source}")]
  Version {
    name: String,
    #[source]
    source: VersionError,
  },

  #[error("gem '{name}': dependency '{dependency}': {source}")]
  Dependency {
    name: String,
    dependency: String,
    #[source]
    source: VersionError,
  },

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },
}

/// Whether a dependency is needed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
  Runtime,
  Development,
}

/// A dependency declared by a gem specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
  pub name: String,
  pub requirement: Requirement,
  pub kind: DependencyKind,
}

/// The subset of a gem specification needed for packaging.
#[derive(Debug, Clone)]
pub struct GemSpec {
  pub name: String,
  pub version: GemVersion,
  pub platform: String,
  pub files: Vec<String>,
  /// `Dir[...]` patterns found in place of a literal `files` list.
  pub file_globs: Vec<String>,
  pub require_paths: Vec<String>,
  pub executables: Vec<String>,
  pub bindir: String,
  pub default_executable: Option<String>,
  pub dependencies: Vec<Dependency>,
  /// The specification file this spec was read from.
  pub loaded_from: Option<PathBuf>,
  /// The gem directory holding `specifications/` and `gems/`.
  pub base_dir: Option<PathBuf>,
}

impl GemSpec {
  /// Create a bare specification, mainly for tests and synthetic gems.
  pub fn new(name: &str, version: GemVersion) -> Self {
    Self {
      name: name.to_string(),
      version,
      platform: "ruby".to_string(),
      files: Vec::new(),
      file_globs: Vec::new(),
      require_paths: vec!["lib".to_string()],
      executables: Vec::new(),
      bindir: "bin".to_string(),
      default_executable: None,
      dependencies: Vec::new(),
      loaded_from: None,
      base_dir: None,
    }
  }

  /// `name-version`, with `-platform` appended for non-ruby platforms.
  pub fn full_name(&self) -> String {
    if self.platform == "ruby" || self.platform.is_empty() {
      format!("{}-{}", self.name, self.version)
    } else {
      format!("{}-{}-{}", self.name, self.version, self.platform)
    }
  }

  /// Directory the gem is unpacked into.
  pub fn full_gem_path(&self) -> Option<PathBuf> {
    self.base_dir.as_ref().map(|base| base.join("gems").join(self.full_name()))
  }

  pub fn runtime_dependencies(&self) -> impl Iterator<Item = &Dependency> {
    self.dependencies.iter().filter(|d| d.kind == DependencyKind::Runtime)
  }

  /// Read an installed specification file.
  ///
  /// The gem directory is taken to be the parent of the `specifications`
  /// directory holding the file.
  pub fn load(path: &Path) -> Result<Self, SpecParseError> {
    let source = fs::read_to_string(path).map_err(|e| SpecParseError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;
    let mut spec = Self::parse(&source)?;
    spec.loaded_from = Some(path.to_path_buf());
    spec.base_dir = path.parent().and_then(Path::parent).map(Path::to_path_buf);
    Ok(spec)
  }

  /// Parse the text of a gemspec.
  pub fn parse(source: &str) -> Result<Self, SpecParseError> {
    let mut name = None;
    let mut version = None;
    let mut stub_platform = None;
    let mut fields = ParsedFields::default();

    for line in source.lines() {
      if let Some(stub) = line.trim().strip_prefix("# stub:") {
        stub_platform = stub.split_whitespace().nth(2).map(str::to_string);
      }
    }

    for statement in statements(source) {
      let Some((method, rest)) = receiver_call(&statement) else {
        continue;
      };
      if let Some(expr) = rest.strip_prefix('=').filter(|e| !e.starts_with('=')) {
        let expr = strip_modifier(expr.trim());
        let values = string_literals(expr);
        match method {
          "name" => name = values.into_iter().next(),
          "version" => version = values.into_iter().next(),
          _ => fields.assign(method, expr, values),
        }
      } else {
        fields.call(method, rest);
      }
    }

    let name = name.ok_or(SpecParseError::MissingName)?;
    let version = GemVersion::parse(version.as_deref().unwrap_or("0")).map_err(|e| SpecParseError::Version {
      name: name.clone(),
      source: e,
    })?;

    let mut dependencies: Vec<Dependency> = Vec::new();
    for (kind, args) in fields.dependencies {
      let mut args = args.into_iter();
      let Some(dep_name) = args.next() else {
        continue;
      };
      // Older generated specs repeat each dependency in an if/else branch.
      if dependencies.iter().any(|d| d.name == dep_name) {
        continue;
      }
      let constraints: Vec<String> = args.collect();
      let requirement = Requirement::parse_all(&constraints).map_err(|e| SpecParseError::Dependency {
        name: name.clone(),
        dependency: dep_name.clone(),
        source: e,
      })?;
      dependencies.push(Dependency {
        name: dep_name,
        requirement,
        kind,
      });
    }

    let mut spec = Self::new(&name, version);
    spec.platform = fields.platform.or(stub_platform).unwrap_or_else(|| "ruby".to_string());
    spec.files = fields.files;
    spec.file_globs = fields.file_globs;
    if let Some(paths) = fields.require_paths {
      spec.require_paths = paths;
    }
    spec.executables = fields.executables;
    if let Some(bindir) = fields.bindir {
      spec.bindir = bindir;
    }
    spec.default_executable = fields.default_executable;
    spec.dependencies = dependencies;
    Ok(spec)
  }
}

#[derive(Default)]
struct ParsedFields {
  platform: Option<String>,
  files: Vec<String>,
  file_globs: Vec<String>,
  require_paths: Option<Vec<String>>,
  executables: Vec<String>,
  bindir: Option<String>,
  default_executable: Option<String>,
  dependencies: Vec<(DependencyKind, Vec<String>)>,
}

impl ParsedFields {
  fn assign(&mut self, method: &str, expr: &str, values: Vec<String>) {
    match method {
      "platform" => self.platform = values.into_iter().next(),
      "files" => {
        if expr.starts_with("Dir") {
          self.file_globs = values;
        } else {
          self.files = values;
        }
      }
      "require_paths" => self.require_paths = Some(values),
      "executables" => self.executables = values,
      "bindir" => self.bindir = values.into_iter().next(),
      "default_executable" => self.default_executable = values.into_iter().next(),
      _ => {}
    }
  }

  fn call(&mut self, method: &str, args: &str) {
    let kind = match method {
      "add_runtime_dependency" | "add_dependency" => DependencyKind::Runtime,
      "add_development_dependency" => DependencyKind::Development,
      _ => return,
    };
    self.dependencies.push((kind, string_literals(strip_modifier(args))));
  }
}

/// Split `receiver.method rest` into `(method, rest)`.
fn receiver_call(statement: &str) -> Option<(&str, &str)> {
  let dot = statement.find('.')?;
  let receiver = &statement[..dot];
  if receiver.is_empty() || !receiver.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return None;
  }
  let tail = &statement[dot + 1..];
  let end = tail
    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
    .unwrap_or(tail.len());
  let method = &tail[..end];
  if method.is_empty() {
    return None;
  }
  Some((method, tail[end..].trim()))
}

/// Drop a trailing `if ...` / `unless ...` modifier outside of literals.
fn strip_modifier(expr: &str) -> &str {
  let mut state = LiteralScanner::default();
  let bytes = expr.as_bytes();
  for (i, c) in expr.char_indices() {
    if state.outside() && c == ' ' {
      let rest = &expr[i..];
      if rest.starts_with(" if ") || rest.starts_with(" unless ") {
        return expr[..i].trim_end();
      }
    }
    state.feed(c, bytes.get(i + 1).copied().map(char::from));
  }
  expr
}

/// Join physical lines into statements, keeping bracketed literals whole and
/// dropping comments.
fn statements(source: &str) -> Vec<String> {
  let mut out = Vec::new();
  let mut current = String::new();
  let mut state = LiteralScanner::default();

  for line in source.lines() {
    let chars: Vec<char> = line.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
      if state.outside() && c == '#' {
        break;
      }
      state.feed(c, chars.get(i + 1).copied());
      current.push(c);
    }
    if state.depth == 0 && state.quote.is_none() {
      let trimmed = current.trim();
      if !trimmed.is_empty() {
        out.push(trimmed.to_string());
      }
      current.clear();
    } else {
      current.push(' ');
    }
  }
  let trimmed = current.trim();
  if !trimmed.is_empty() {
    out.push(trimmed.to_string());
  }
  out
}

/// Tracks whether the scanner is inside a string literal or brackets.
#[derive(Default)]
struct LiteralScanner {
  quote: Option<char>,
  escaped: bool,
  depth: i32,
  /// Progress through a `%q<` style opener: 1 after `%`, 2 after the letter.
  percent: u8,
}

impl LiteralScanner {
  fn outside(&self) -> bool {
    self.quote.is_none()
  }

  fn feed(&mut self, c: char, next: Option<char>) {
    if let Some(close) = self.quote {
      if self.escaped {
        self.escaped = false;
      } else if c == '\\' {
        self.escaped = true;
      } else if c == close {
        self.quote = None;
      }
      return;
    }
    match self.percent {
      1 => {
        self.percent = 2;
        return;
      }
      2 => {
        self.percent = 0;
        if let Some(close) = closing_delimiter(c) {
          self.quote = Some(close);
          return;
        }
      }
      _ => {}
    }
    match c {
      '"' | '\'' => self.quote = Some(c),
      '%' if next.is_some_and(|n| matches!(n, 'q' | 'Q' | 'w' | 'W')) => self.percent = 1,
      '[' | '(' | '{' => self.depth += 1,
      ']' | ')' | '}' => self.depth -= 1,
      _ => {}
    }
  }
}

fn closing_delimiter(open: char) -> Option<char> {
  match open {
    '<' => Some('>'),
    '{' => Some('}'),
    '(' => Some(')'),
    '[' => Some(']'),
    '|' | '!' | '/' => Some(open),
    _ => None,
  }
}

/// Extract the contents of every string literal in an expression.
///
/// `%w[...]` word arrays contribute one value per word.
fn string_literals(expr: &str) -> Vec<String> {
  let chars: Vec<char> = expr.chars().collect();
  let mut out = Vec::new();
  let mut i = 0;
  while i < chars.len() {
    let c = chars[i];
    if c == '"' || c == '\'' {
      let (value, next) = read_until(&chars, i + 1, c);
      out.push(value);
      i = next;
    } else if c == '%' && i + 2 < chars.len() && matches!(chars[i + 1], 'q' | 'Q' | 'w' | 'W') {
      let Some(close) = closing_delimiter(chars[i + 2]) else {
        i += 1;
        continue;
      };
      let (value, next) = read_until(&chars, i + 3, close);
      if matches!(chars[i + 1], 'w' | 'W') {
        out.extend(value.split_whitespace().map(str::to_string));
      } else {
        out.push(value);
      }
      i = next;
    } else {
      i += 1;
    }
  }
  out
}

fn read_until(chars: &[char], start: usize, close: char) -> (String, usize) {
  let mut value = String::new();
  let mut i = start;
  while i < chars.len() {
    let c = chars[i];
    if c == '\\' && i + 1 < chars.len() {
      value.push(chars[i + 1]);
      i += 2;
      continue;
    }
    if c == close {
      return (value, i + 1);
    }
    value.push(c);
    i += 1;
  }
  (value, i)
}
