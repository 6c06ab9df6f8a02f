//! Rubygems version numbers and requirements.
//!
//! Versions compare segment by segment: numeric segments numerically,
//! alphabetic segments lexically, and an alphabetic segment always sorts
//! before a numeric one (so `1.0.a` is a prerelease of `1.0`). Missing
//! trailing segments count as zero, which makes `1.0` equal to `1`.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
  #[error("malformed version number '{0}'")]
  Malformed(String),

  #[error("unknown requirement operator '{op}' in '{requirement}'")]
  UnknownOperator { op: String, requirement: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Num(u64),
  Str(String),
}

/// A parsed gem version such as `13.0.6` or `2.0.0.rc1`.
#[derive(Debug, Clone)]
pub struct GemVersion {
  raw: String,
  segments: Vec<Segment>,
}

impl GemVersion {
  pub fn parse(input: &str) -> Result<Self, VersionError> {
    let raw = input.trim();
    if raw.is_empty() || !raw.starts_with(|c: char| c.is_ascii_digit()) {
      return Err(VersionError::Malformed(input.to_string()));
    }
    if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
      return Err(VersionError::Malformed(input.to_string()));
    }

    // Rubygems treats `1.0-beta` as `1.0.pre.beta`.
    let normalized = raw.replace('-', ".pre.");
    let mut segments = Vec::new();
    for part in normalized.split('.') {
      if part.is_empty() {
        return Err(VersionError::Malformed(input.to_string()));
      }
      split_runs(part, &mut segments).map_err(|_| VersionError::Malformed(input.to_string()))?;
    }

    Ok(Self {
      raw: raw.to_string(),
      segments,
    })
  }

  /// Whether any segment is alphabetic.
  pub fn is_prerelease(&self) -> bool {
    self.segments.iter().any(|s| matches!(s, Segment::Str(_)))
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  /// Upper bound used by the pessimistic `~>` operator.
  ///
  /// Prerelease segments are dropped, then the last remaining segment is
  /// removed (unless it is the only one) and the new last one incremented:
  /// `1.2.3` bumps to `1.3`, `1.2` to `2`, `3` to `4`.
  fn bump(&self) -> GemVersion {
    let mut nums: Vec<u64> = self
      .segments
      .iter()
      .take_while(|s| matches!(s, Segment::Num(_)))
      .map(|s| match s {
        Segment::Num(n) => *n,
        Segment::Str(_) => 0,
      })
      .collect();
    if nums.len() > 1 {
      nums.pop();
    }
    if let Some(last) = nums.last_mut() {
      *last += 1;
    }
    let raw = nums.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
    GemVersion {
      raw,
      segments: nums.into_iter().map(Segment::Num).collect(),
    }
  }
}

fn split_runs(part: &str, out: &mut Vec<Segment>) -> Result<(), std::num::ParseIntError> {
  let mut current = String::new();
  let mut numeric = None;
  for c in part.chars() {
    let is_digit = c.is_ascii_digit();
    if numeric.is_some_and(|n| n != is_digit) {
      out.push(make_segment(&current, numeric == Some(true))?);
      current.clear();
    }
    numeric = Some(is_digit);
    current.push(c);
  }
  if !current.is_empty() {
    out.push(make_segment(&current, numeric == Some(true))?);
  }
  Ok(())
}

fn make_segment(run: &str, numeric: bool) -> Result<Segment, std::num::ParseIntError> {
  if numeric {
    Ok(Segment::Num(run.parse()?))
  } else {
    Ok(Segment::Str(run.to_string()))
  }
}

impl Ord for GemVersion {
  fn cmp(&self, other: &Self) -> Ordering {
    let len = self.segments.len().max(other.segments.len());
    let zero = Segment::Num(0);
    for i in 0..len {
      let lhs = self.segments.get(i).unwrap_or(&zero);
      let rhs = other.segments.get(i).unwrap_or(&zero);
      let ord = match (lhs, rhs) {
        (Segment::Num(a), Segment::Num(b)) => a.cmp(b),
        (Segment::Str(a), Segment::Str(b)) => a.cmp(b),
        (Segment::Str(_), Segment::Num(_)) => Ordering::Less,
        (Segment::Num(_), Segment::Str(_)) => Ordering::Greater,
      };
      if ord != Ordering::Equal {
        return ord;
      }
    }
    Ordering::Equal
  }
}

impl PartialOrd for GemVersion {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for GemVersion {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for GemVersion {}

impl fmt::Display for GemVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}

/// Comparison operator of a single requirement clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  Eq,
  Ne,
  Gt,
  Lt,
  Ge,
  Le,
  Pessimistic,
}

impl Op {
  fn as_str(self) -> &'static str {
    match self {
      Op::Eq => "=",
      Op::Ne => "!=",
      Op::Gt => ">",
      Op::Lt => "<",
      Op::Ge => ">=",
      Op::Le => "<=",
      Op::Pessimistic => "~>",
    }
  }
}

/// A conjunction of version constraints, e.g. `>= 1.2, < 2`.
///
/// An empty requirement (`>= 0`) accepts every release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
  clauses: Vec<(Op, GemVersion)>,
}

impl Requirement {
  /// The requirement matched by every version.
  pub fn any() -> Self {
    Self { clauses: Vec::new() }
  }

  /// Exactly one version.
  pub fn exact(version: GemVersion) -> Self {
    Self {
      clauses: vec![(Op::Eq, version)],
    }
  }

  /// Parse a comma separated requirement string.
  ///
  /// A bare version means `=`; an empty string means any version.
  pub fn parse(input: &str) -> Result<Self, VersionError> {
    let mut clauses = Vec::new();
    for clause in input.split(',') {
      let clause = clause.trim();
      if clause.is_empty() {
        continue;
      }
      let split = clause
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| VersionError::Malformed(clause.to_string()))?;
      let (op, version) = clause.split_at(split);
      let op = match op.trim() {
        "" | "=" => Op::Eq,
        "!=" => Op::Ne,
        ">" => Op::Gt,
        "<" => Op::Lt,
        ">=" => Op::Ge,
        "<=" => Op::Le,
        "~>" => Op::Pessimistic,
        other => {
          return Err(VersionError::UnknownOperator {
            op: other.to_string(),
            requirement: input.to_string(),
          });
        }
      };
      clauses.push((op, GemVersion::parse(version)?));
    }
    Ok(Self { clauses })
  }

  /// Parse several requirement strings into a single conjunction.
  pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Self, VersionError> {
    let mut clauses = Vec::new();
    for input in inputs {
      clauses.extend(Self::parse(input.as_ref())?.clauses);
    }
    Ok(Self { clauses })
  }

  /// Whether the requirement explicitly asks for a prerelease.
  pub fn is_prerelease(&self) -> bool {
    self.clauses.iter().any(|(_, v)| v.is_prerelease())
  }

  pub fn is_satisfied_by(&self, version: &GemVersion) -> bool {
    self.clauses.iter().all(|(op, v)| match op {
      Op::Eq => version == v,
      Op::Ne => version != v,
      Op::Gt => version > v,
      Op::Lt => version < v,
      Op::Ge => version >= v,
      Op::Le => version <= v,
      Op::Pessimistic => version >= v && *version < v.bump(),
    })
  }
}

impl fmt::Display for Requirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.clauses.is_empty() {
      return f.write_str(">= 0");
    }
    let parts: Vec<String> = self.clauses.iter().map(|(op, v)| format!("{} {}", op.as_str(), v)).collect();
    f.write_str(&parts.join(", "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> GemVersion {
    GemVersion::parse(s).unwrap()
  }

  #[test]
  fn numeric_segments_compare_numerically() {
    assert!(v("1.10") > v("1.9"));
    assert!(v("13.0.6") > v("13.0.3"));
    assert_eq!(v("1.0"), v("1"));
    assert_eq!(v("1.0.0"), v("1"));
  }

  #[test]
  fn prereleases_sort_before_releases() {
    assert!(v("1.0.a") < v("1.0"));
    assert!(v("2.0.0.rc1") < v("2.0.0"));
    assert!(v("2.0.0.beta") < v("2.0.0.rc"));
    assert!(v("1.0-beta").is_prerelease());
    assert!(!v("1.0").is_prerelease());
  }

  #[test]
  fn malformed_versions_are_rejected() {
    assert!(GemVersion::parse("").is_err());
    assert!(GemVersion::parse("abc").is_err());
    assert!(GemVersion::parse("1..2").is_err());
    assert!(GemVersion::parse("1.0 beta").is_err());
  }

  #[test]
  fn bare_version_means_exact() {
    let req = Requirement::parse("1.2.3").unwrap();
    assert!(req.is_satisfied_by(&v("1.2.3")));
    assert!(!req.is_satisfied_by(&v("1.2.4")));
  }

  #[test]
  fn pessimistic_operator_bounds() {
    let req = Requirement::parse("~> 1.2.3").unwrap();
    assert!(req.is_satisfied_by(&v("1.2.3")));
    assert!(req.is_satisfied_by(&v("1.2.9")));
    assert!(!req.is_satisfied_by(&v("1.3")));

    let req = Requirement::parse("~> 1.2").unwrap();
    assert!(req.is_satisfied_by(&v("1.9")));
    assert!(!req.is_satisfied_by(&v("2.0")));
  }

  #[test]
  fn compound_requirements_are_conjunctions() {
    let req = Requirement::parse(">= 1.0, < 2").unwrap();
    assert!(req.is_satisfied_by(&v("1.5")));
    assert!(!req.is_satisfied_by(&v("2.0")));
    assert!(!req.is_satisfied_by(&v("0.9")));

    let req = Requirement::parse_all(&[">= 1.0", "!= 1.1"]).unwrap();
    assert!(!req.is_satisfied_by(&v("1.1")));
    assert_eq!(req.to_string(), ">= 1.0, != 1.1");
  }

  #[test]
  fn any_requirement_matches_everything() {
    let req = Requirement::parse("").unwrap();
    assert_eq!(req, Requirement::any());
    assert!(req.is_satisfied_by(&v("0.0.1")));
    assert_eq!(req.to_string(), ">= 0");
  }

  #[test]
  fn unknown_operator_is_an_error() {
    assert!(matches!(
      Requirement::parse("=> 1.0"),
      Err(VersionError::UnknownOperator { .. })
    ));
  }
}
