//! Implementation of `warble war` and `warble jar`.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::warn;

use warbler_lib::config::Feature;

use super::{ProjectArgs, lib_err};
use crate::output::{format_bytes, format_duration, print_stat, print_success};

/// The archive type a build command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  War,
  Jar,
}

impl ArchiveKind {
  fn extension(self) -> &'static str {
    match self {
      ArchiveKind::War => "war",
      ArchiveKind::Jar => "jar",
    }
  }
}

/// Configure the project, enable `features`, and write the archive.
///
/// The detected traits decide the archive type; asking for the other one
/// only produces a warning.
pub fn cmd_build(project: &ProjectArgs, kind: ArchiveKind, features: &[Feature]) -> Result<()> {
  let start = Instant::now();
  let mut app = project.load()?;
  for &feature in features {
    app.enable_feature(feature);
  }

  let extension = &app.config().jar_extension;
  if extension != kind.extension() {
    warn!(
      requested = kind.extension(),
      detected = %extension,
      "project is not packaged as the requested archive type; building a .{} instead",
      extension
    );
  }

  let path = app.build().map_err(lib_err).context("Failed to build archive")?;
  let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

  print_success(&format!("Created {}", path.display()));
  print_stat("Size", &format_bytes(size));
  print_stat("Duration", &format_duration(start.elapsed()));
  Ok(())
}
