//! Path rewriting for archive entries.
//!
//! Every file that lands in an archive passes through a chain of rewrite
//! patterns registered under a category (`application`, `gems`, ...). The
//! patterns use a small `pathmap` language:
//!
//! - `%p` - the whole path
//! - `%f` - the basename, with extension
//! - `%n` - the basename, without extension
//! - `%d` - the directory part (`.` when there is none)
//! - `%x` - the extension, including the dot
//! - `%X` - everything except the extension
//! - `%%` - a literal percent sign
//! - `%{pattern,replacement}X` - the value of specifier `X` with the first
//!   occurrence of `pattern` replaced; several `pattern,replacement` pairs
//!   may be separated by `;`, and a pattern ending in `$` only matches at
//!   the end of the value
//!
//! # Example
//!
//! ```
//! use warbler_lib::pathmap::pathmap;
//!
//! assert_eq!(pathmap("public/images/logo.png", "%{public/,}p").unwrap(), "images/logo.png");
//! assert_eq!(pathmap("config/web.xml.erb", "WEB-INF/%{.erb$,}f").unwrap(), "WEB-INF/web.xml");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known path mapping categories.
pub mod category {
  pub const APPLICATION: &str = "application";
  pub const GEMS: &str = "gems";
  pub const GEMSPECS: &str = "gemspecs";
  pub const JAVA_LIBS: &str = "java_libs";
  pub const JAVA_CLASSES: &str = "java_classes";
  pub const PUBLIC_HTML: &str = "public_html";
  pub const WEBINF: &str = "webinf";
}

/// Errors produced while interpreting a pathmap pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathmapError {
  #[error("unknown pathmap specifier '%{specifier}' in '{pattern}'")]
  UnknownSpecifier { specifier: char, pattern: String },

  #[error("unclosed substitution in pathmap pattern '{0}'")]
  Unclosed(String),

  #[error("pathmap pattern '{0}' ends with a bare '%'")]
  Dangling(String),

  #[error("substitution in pathmap pattern '{0}' must be followed by a specifier")]
  MissingSpecifier(String),
}

/// Ordered rewrite patterns keyed by category name.
///
/// Patterns for a category are applied in the order they were registered,
/// each one consuming the output of the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMapTable(BTreeMap<String, Vec<String>>);

impl PathMapTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the patterns of a category.
  pub fn set(&mut self, category: &str, patterns: Vec<String>) {
    self.0.insert(category.to_string(), patterns);
  }

  /// Append a pattern to the end of a category's chain.
  pub fn push(&mut self, category: &str, pattern: impl Into<String>) {
    self.0.entry(category.to_string()).or_default().push(pattern.into());
  }

  /// Patterns registered for a category, if any.
  pub fn get(&self, category: &str) -> Option<&[String]> {
    self.0.get(category).map(Vec::as_slice)
  }

  /// Mutable access to a category's patterns.
  pub fn get_mut(&mut self, category: &str) -> Option<&mut Vec<String>> {
    self.0.get_mut(category)
  }

  /// Rewrite `path` through every pattern registered under `category`.
  ///
  /// A leading `./` is stripped first. With no registered patterns the path
  /// is returned unchanged.
  pub fn apply(&self, category: &str, path: &str) -> Result<String, PathmapError> {
    let mut current = strip_dot_slash(path).to_string();
    if let Some(patterns) = self.0.get(category) {
      for pattern in patterns {
        current = pathmap(&current, pattern)?;
      }
    }
    Ok(current)
  }
}

/// Strip a leading `./` from a relative path.
pub fn strip_dot_slash(path: &str) -> &str {
  path.strip_prefix("./").unwrap_or(path)
}

/// Rewrite a single path with a single pathmap pattern.
pub fn pathmap(path: &str, pattern: &str) -> Result<String, PathmapError> {
  let mut out = String::with_capacity(pattern.len() + path.len());
  let mut chars = pattern.char_indices().peekable();

  while let Some((_, c)) = chars.next() {
    if c != '%' {
      out.push(c);
      continue;
    }

    let Some((start, next)) = chars.next() else {
      return Err(PathmapError::Dangling(pattern.to_string()));
    };

    if next == '{' {
      let body_start = start + 1;
      let Some(close) = pattern[body_start..].find('}') else {
        return Err(PathmapError::Unclosed(pattern.to_string()));
      };
      let body = &pattern[body_start..body_start + close];

      // Skip past the closing brace.
      while let Some(&(idx, _)) = chars.peek() {
        chars.next();
        if idx == body_start + close {
          break;
        }
      }

      let Some((_, spec)) = chars.next() else {
        return Err(PathmapError::MissingSpecifier(pattern.to_string()));
      };
      let value = expand(path, spec, pattern)?;
      out.push_str(&substitute(&value, body));
    } else {
      out.push_str(&expand(path, next, pattern)?);
    }
  }

  Ok(out)
}

fn expand(path: &str, spec: char, pattern: &str) -> Result<String, PathmapError> {
  let value = match spec {
    'p' => path.to_string(),
    'f' => basename(path).to_string(),
    'n' => {
      let base = basename(path);
      base[..base.len() - extension(base).len()].to_string()
    }
    'd' => dirname(path).to_string(),
    'x' => extension(basename(path)).to_string(),
    'X' => path[..path.len() - extension(basename(path)).len()].to_string(),
    's' => "/".to_string(),
    '%' => "%".to_string(),
    other => {
      return Err(PathmapError::UnknownSpecifier {
        specifier: other,
        pattern: pattern.to_string(),
      });
    }
  };
  Ok(value)
}

/// Apply `pat,rep;pat,rep` substitutions to a value.
fn substitute(value: &str, body: &str) -> String {
  let mut result = value.to_string();
  for pair in body.split(';') {
    let (pat, rep) = pair.split_once(',').unwrap_or((pair, ""));
    if pat.is_empty() {
      continue;
    }
    if let Some(anchored) = pat.strip_suffix('$') {
      if let Some(head) = result.strip_suffix(anchored) {
        result = format!("{}{}", head, rep);
      }
    } else {
      result = result.replacen(pat, rep, 1);
    }
  }
  result
}

fn basename(path: &str) -> &str {
  let trimmed = path.trim_end_matches('/');
  match trimmed.rfind('/') {
    Some(idx) => &trimmed[idx + 1..],
    None => trimmed,
  }
}

fn dirname(path: &str) -> &str {
  let trimmed = path.trim_end_matches('/');
  match trimmed.rfind('/') {
    Some(0) => "/",
    Some(idx) => &trimmed[..idx],
    None => ".",
  }
}

/// Extension of a basename including the dot; dotfiles have none.
fn extension(base: &str) -> &str {
  match base.rfind('.') {
    Some(0) | None => "",
    Some(idx) if idx == base.len() - 1 => "",
    Some(idx) => &base[idx..],
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn specifiers_expand_path_parts() {
    assert_eq!(pathmap("a/b/c.rb", "%p").unwrap(), "a/b/c.rb");
    assert_eq!(pathmap("a/b/c.rb", "%f").unwrap(), "c.rb");
    assert_eq!(pathmap("a/b/c.rb", "%n").unwrap(), "c");
    assert_eq!(pathmap("a/b/c.rb", "%d").unwrap(), "a/b");
    assert_eq!(pathmap("a/b/c.rb", "%x").unwrap(), ".rb");
    assert_eq!(pathmap("a/b/c.rb", "%X").unwrap(), "a/b/c");
    assert_eq!(pathmap("c.rb", "%d").unwrap(), ".");
    assert_eq!(pathmap("a/.hidden", "%x").unwrap(), "");
    assert_eq!(pathmap("x", "100%%").unwrap(), "100%");
  }

  #[test]
  fn literal_text_surrounds_specifiers() {
    assert_eq!(pathmap("app/models/user.rb", "WEB-INF/%p").unwrap(), "WEB-INF/app/models/user.rb");
    assert_eq!(pathmap("lib/java/foo.jar", "WEB-INF/lib/%f").unwrap(), "WEB-INF/lib/foo.jar");
  }

  #[test]
  fn substitution_replaces_first_match_only() {
    assert_eq!(pathmap("public/a/public/b", "%{public/,}p").unwrap(), "a/public/b");
    assert_eq!(pathmap("src/x.rb", "%{src,lib}p").unwrap(), "lib/x.rb");
    assert_eq!(pathmap("src/x.rb", "%{nomatch,lib}p").unwrap(), "src/x.rb");
  }

  #[test]
  fn anchored_substitution_only_matches_at_end() {
    assert_eq!(pathmap("config/web.xml.erb", "WEB-INF/%{.erb$,}f").unwrap(), "WEB-INF/web.xml");
    assert_eq!(pathmap("config/x.erb.xml", "%{.erb$,}f").unwrap(), "x.erb.xml");
  }

  #[test]
  fn multiple_substitution_pairs() {
    assert_eq!(pathmap("src/a/b.txt", "%{src,out;a,z}p").unwrap(), "out/z/b.txt");
  }

  #[test]
  fn malformed_patterns_are_rejected() {
    assert!(matches!(pathmap("a", "%q"), Err(PathmapError::UnknownSpecifier { specifier: 'q', .. })));
    assert!(matches!(pathmap("a", "%{a,b"), Err(PathmapError::Unclosed(_))));
    assert!(matches!(pathmap("a", "x%"), Err(PathmapError::Dangling(_))));
    assert!(matches!(pathmap("a", "%{a,b}"), Err(PathmapError::MissingSpecifier(_))));
  }

  #[test]
  fn table_applies_chain_in_order() {
    let mut table = PathMapTable::new();
    table.push(category::APPLICATION, "WEB-INF/%p");
    table.push(category::APPLICATION, "%{WEB-INF/,root/}p");
    assert_eq!(table.apply(category::APPLICATION, "app/x.rb").unwrap(), "root/app/x.rb");
  }

  #[test]
  fn empty_category_passes_through() {
    let table = PathMapTable::new();
    for path in ["a", "a/b/c.rb", "deep/nested/dir/"] {
      assert_eq!(table.apply("gems", path).unwrap(), path);
    }
  }

  #[test]
  fn leading_dot_slash_is_stripped() {
    let mut table = PathMapTable::new();
    table.set(category::APPLICATION, vec!["myapp/%p".to_string()]);
    assert_eq!(table.apply(category::APPLICATION, "./bin/run").unwrap(), "myapp/bin/run");
    assert_eq!(PathMapTable::new().apply("x", "./lib/a.rb").unwrap(), "lib/a.rb");
  }
}
