//! Implementation of `warble config`.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use warbler_lib::init::init;

use super::ProjectArgs;
use crate::output::{print_json, print_success, symbols};

/// Write `config/warble.lua` and its editor support files.
pub fn cmd_config_init(project: &ProjectArgs, force: bool) -> Result<()> {
  let result = init(project.dir(), force).context("Failed to write configuration template")?;

  print_success("Wrote configuration template");
  println!();
  println!(
    "  {} Configuration: {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.cyan()),
    result.config_file.display()
  );
  println!(
    "  {} Types:         {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.cyan()),
    result.types_file.display()
  );
  if let Some(luarc) = &result.luarc_json {
    println!(
      "  {} LuaLS config:  {}",
      symbols::INFO.if_supports_color(Stream::Stdout, |s| s.cyan()),
      luarc.display()
    );
  }
  Ok(())
}

/// Print the configuration after every trait hook and the user block ran.
pub fn cmd_config_print(project: &ProjectArgs) -> Result<()> {
  let app = project.load()?;
  print_json(app.config())
}
