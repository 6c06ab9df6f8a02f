//! Implementation of `warble traits`.

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use super::ProjectArgs;
use crate::output::{OutputFormat, print_json, print_stat, symbols};

/// Print the detected traits in the order their hooks run.
pub fn cmd_traits(project: &ProjectArgs, output: OutputFormat) -> Result<()> {
  let app = project.load()?;
  let traits = app.traits();

  if output.is_json() {
    let json = serde_json::json!({
      "traits": traits,
      "archive": app.config().archive_file_name(),
    });
    print_json(&json)?;
  } else {
    println!("Traits:");
    for t in &traits {
      println!(
        "  {} {}",
        symbols::INFO.if_supports_color(Stream::Stdout, |s| s.cyan()),
        t
      );
    }
    println!();
    print_stat("Archive", &app.config().archive_file_name());
  }
  Ok(())
}
