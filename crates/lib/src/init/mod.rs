//! Scaffold a project configuration.
//!
//! This module provides the core logic for `warble config`, which writes:
//! - `config/warble.lua` with the available settings commented out
//! - `config/types/warble.d.lua` type definitions for LuaLS
//! - `.luarc.json` pointing LuaLS at those definitions

mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::consts::CONFIG_FILE;

pub use templates::{LUARC_JSON_TEMPLATE, WARBLE_D_LUA, WARBLE_LUA_TEMPLATE};

/// Project-relative directory holding the type definitions.
pub const TYPES_DIR: &str = "config/types";

#[derive(Debug, Error)]
pub enum InitError {
  #[error("file already exists: {}", path.display())]
  PathExists { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },
}

/// Files written by [`init`].
#[derive(Debug)]
pub struct InitResult {
  pub config_file: PathBuf,
  pub types_file: PathBuf,
  /// `None` when an existing `.luarc.json` was left alone.
  pub luarc_json: Option<PathBuf>,
}

/// Write the configuration template into `project_dir`.
///
/// An existing configuration file is only replaced with `force`. An
/// existing `.luarc.json` is never touched.
pub fn init(project_dir: &Path, force: bool) -> Result<InitResult, InitError> {
  let config_file = project_dir.join(CONFIG_FILE);
  if config_file.exists() && !force {
    return Err(InitError::PathExists { path: config_file });
  }

  let types_dir = project_dir.join(TYPES_DIR);
  fs::create_dir_all(&types_dir).map_err(|e| InitError::CreateDir {
    path: types_dir.clone(),
    source: e,
  })?;

  write(&config_file, WARBLE_LUA_TEMPLATE)?;
  let types_file = types_dir.join("warble.d.lua");
  write(&types_file, WARBLE_D_LUA)?;

  let luarc = project_dir.join(".luarc.json");
  let luarc_json = if luarc.exists() {
    info!(path = %luarc.display(), "keeping existing .luarc.json");
    None
  } else {
    write(&luarc, &LUARC_JSON_TEMPLATE.replace("{types_path}", TYPES_DIR))?;
    Some(luarc)
  };

  info!(path = %config_file.display(), "wrote configuration template");
  Ok(InitResult {
    config_file,
    types_file,
    luarc_json,
  })
}

fn write(path: &Path, contents: &str) -> Result<(), InitError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|e| InitError::CreateDir {
      path: parent.to_path_buf(),
      source: e,
    })?;
  }
  fs::write(path, contents).map_err(|e| InitError::WriteFile {
    path: path.to_path_buf(),
    source: e,
  })
}
