//! The ordered set of gems requested for packaging.

use serde::{Deserialize, Serialize};

use super::version::{Requirement, VersionError};

/// One entry as written in a configuration file: either a bare gem name or a
/// `{ name = ..., version = ... }` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GemEntry {
  Name(String),
  Pinned { name: String, version: String },
}

/// Gem name to version requirement, in insertion order.
///
/// A name appears at most once. Adding a name that is already present is a
/// no-op, so the first constraint recorded for a gem is the one kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<GemEntry>", into = "Vec<GemEntry>")]
pub struct GemSpecSet {
  entries: Vec<(String, Option<String>)>,
}

impl GemSpecSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a gem accepting any version. Returns false if it was already present.
  pub fn add(&mut self, name: &str) -> bool {
    self.insert(name, None)
  }

  /// Add a gem with a requirement string such as `~> 1.2` or `= 13.0.6`.
  pub fn add_with_requirement(&mut self, name: &str, requirement: &str) -> bool {
    self.insert(name, Some(requirement.to_string()))
  }

  fn insert(&mut self, name: &str, requirement: Option<String>) -> bool {
    if self.contains(name) {
      return false;
    }
    self.entries.push((name.to_string(), requirement));
    true
  }

  pub fn remove(&mut self, name: &str) -> bool {
    let before = self.entries.len();
    self.entries.retain(|(n, _)| n != name);
    self.entries.len() != before
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.iter().any(|(n, _)| n == name)
  }

  /// The raw requirement recorded for a gem; `Some(None)` means any version.
  pub fn get(&self, name: &str) -> Option<Option<&str>> {
    self
      .entries
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, req)| req.as_deref())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
    self.entries.iter().map(|(n, r)| (n.as_str(), r.as_deref()))
  }

  /// Parsed requirements in insertion order.
  pub fn requirements(&self) -> Result<Vec<(String, Requirement)>, VersionError> {
    self
      .entries
      .iter()
      .map(|(name, req)| {
        let requirement = match req {
          Some(r) => Requirement::parse(r)?,
          None => Requirement::any(),
        };
        Ok((name.clone(), requirement))
      })
      .collect()
  }
}

impl From<Vec<GemEntry>> for GemSpecSet {
  fn from(entries: Vec<GemEntry>) -> Self {
    let mut set = GemSpecSet::new();
    for entry in entries {
      match entry {
        GemEntry::Name(name) => set.add(&name),
        GemEntry::Pinned { name, version } => set.add_with_requirement(&name, &version),
      };
    }
    set
  }
}

impl From<GemSpecSet> for Vec<GemEntry> {
  fn from(set: GemSpecSet) -> Self {
    set
      .entries
      .into_iter()
      .map(|(name, req)| match req {
        Some(version) => GemEntry::Pinned { name, version },
        None => GemEntry::Name(name),
      })
      .collect()
  }
}
