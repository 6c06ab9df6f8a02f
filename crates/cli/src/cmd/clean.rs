use anyhow::{Context, Result};

use super::{ProjectArgs, lib_err};
use crate::output::{print_info, print_success};

pub fn cmd_clean(project: &ProjectArgs) -> Result<()> {
  let app = project.load()?;
  let archive = app.archive_path();
  let removed = app.clean().map_err(lib_err).context("Failed to clean project")?;
  if removed {
    print_success(&format!("Removed {}", archive.display()));
  } else {
    print_info("Nothing to clean");
  }
  Ok(())
}
