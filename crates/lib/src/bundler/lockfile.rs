//! `Gemfile.lock` reader.

use super::BundlerError;

/// Where a locked gem comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockSource {
  Gem,
  Git,
  Path,
}

/// One resolved gem in the lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedSpec {
  pub name: String,
  pub version: String,
  pub platform: Option<String>,
  pub source: LockSource,
  /// Names of the gems this one depends on.
  pub dependencies: Vec<String>,
}

impl LockedSpec {
  pub fn is_java(&self) -> bool {
    self.platform.as_deref().is_some_and(|p| p.contains("java"))
  }
}

/// The sections of a lockfile needed to pick gems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lockfile {
  pub specs: Vec<LockedSpec>,
  /// Top-level dependency names from `DEPENDENCIES`.
  pub dependencies: Vec<String>,
}

impl Lockfile {
  pub fn parse(source: &str) -> Result<Self, BundlerError> {
    let mut lockfile = Lockfile::default();
    let mut section = Section::Other;
    let mut in_specs = false;

    for (index, line) in source.lines().enumerate() {
      let line_no = index + 1;
      if line.trim().is_empty() {
        continue;
      }
      let indent = line.len() - line.trim_start().len();
      let text = line.trim();

      if indent == 0 {
        section = match text {
          "GEM" => Section::Source(LockSource::Gem),
          "GIT" => Section::Source(LockSource::Git),
          "PATH" => Section::Source(LockSource::Path),
          "DEPENDENCIES" => Section::Dependencies,
          _ => Section::Other,
        };
        in_specs = false;
        continue;
      }

      match section {
        Section::Source(source) => match indent {
          2 => in_specs = text == "specs:",
          4 if in_specs => {
            let (name, version) = split_entry(text, line_no)?;
            let version = version.ok_or_else(|| BundlerError::Lockfile {
              line: line_no,
              message: format!("locked gem '{}' has no version", name),
            })?;
            let (version, platform) = split_platform(&version);
            lockfile.specs.push(LockedSpec {
              name,
              version,
              platform,
              source,
              dependencies: Vec::new(),
            });
          }
          6 if in_specs => {
            let (name, _) = split_entry(text, line_no)?;
            if let Some(spec) = lockfile.specs.last_mut() {
              spec.dependencies.push(name);
            }
          }
          _ => {}
        },
        Section::Dependencies if indent == 2 => {
          let (name, _) = split_entry(text, line_no)?;
          lockfile.dependencies.push(name.trim_end_matches('!').to_string());
        }
        _ => {}
      }
    }

    Ok(lockfile)
  }

  /// The locked spec for a gem, preferring a java build.
  pub fn spec(&self, name: &str) -> Option<&LockedSpec> {
    let mut candidates = self.specs.iter().filter(|s| s.name == name);
    let first = candidates.next()?;
    if first.is_java() {
      return Some(first);
    }
    Some(self.specs.iter().find(|s| s.name == name && s.is_java()).unwrap_or(first))
  }
}

#[derive(Debug, Clone, Copy)]
enum Section {
  Source(LockSource),
  Dependencies,
  Other,
}

/// Split `name (version)` into its parts.
fn split_entry(text: &str, line: usize) -> Result<(String, Option<String>), BundlerError> {
  match text.split_once(" (") {
    Some((name, rest)) => {
      let version = rest.strip_suffix(')').ok_or_else(|| BundlerError::Lockfile {
        line,
        message: format!("unterminated version in '{}'", text),
      })?;
      Ok((name.to_string(), Some(version.to_string())))
    }
    None => Ok((text.to_string(), None)),
  }
}

/// Split `1.15.0-java` into version and platform.
fn split_platform(version: &str) -> (String, Option<String>) {
  let split = version
    .char_indices()
    .find(|(i, c)| *c == '-' && version[i + 1..].starts_with(|n: char| n.is_ascii_alphabetic()));
  match split {
    Some((idx, _)) => (version[..idx].to_string(), Some(version[idx + 1..].to_string())),
    None => (version.to_string(), None),
  }
}
