//! The `warble` global table.
//!
//! - `warble.dir` - Absolute path of the project being packaged
//! - `warble.version` - Version of this tool
//! - `warble.traits` - Names of the project's traits, in hook order
//! - `warble.glob(pattern)` - Project-relative paths matching a glob
//! - `warble.path` - Path manipulation utilities

use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::collect::slash_path;
use crate::consts::VERSION;

/// What the configuration file can see about the project.
#[derive(Debug, Clone)]
pub struct ProjectInfo {
  pub dir: PathBuf,
  pub traits: Vec<String>,
}

impl ProjectInfo {
  pub fn new(dir: impl Into<PathBuf>, traits: Vec<String>) -> Self {
    Self {
      dir: dir.into(),
      traits,
    }
  }
}

/// Register the `warble` global table in the Lua runtime.
pub fn register_globals(lua: &Lua, info: &ProjectInfo) -> LuaResult<()> {
  let warble = lua.create_table()?;

  warble.set("dir", info.dir.to_string_lossy().to_string())?;
  warble.set("version", VERSION)?;
  warble.set("traits", lua.create_sequence_from(info.traits.iter().cloned())?)?;

  let dir = info.dir.clone();
  warble.set(
    "glob",
    lua.create_function(move |lua, pattern: String| {
      let matches = project_glob(&dir, &pattern).map_err(LuaError::external)?;
      lua.create_sequence_from(matches)
    })?,
  )?;

  warble.set("path", create_path_helpers(lua)?)?;

  lua.globals().set("warble", warble)?;

  Ok(())
}

fn project_glob(dir: &Path, pattern: &str) -> Result<Vec<String>, glob::PatternError> {
  let base = glob::Pattern::escape(&dir.to_string_lossy());
  let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
  let mut out: Vec<String> = glob::glob(&full)?
    .flatten()
    .filter_map(|p| p.strip_prefix(dir).ok().map(slash_path))
    .collect();
  out.sort();
  Ok(out)
}

/// Create the `warble.path` table.
fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  // warble.path.join(...) - Join segments with `/`
  path.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| {
      let mut parts: Vec<String> = Vec::new();
      for segment in segments {
        if let LuaValue::String(s) = segment {
          parts.push(s.to_str()?.trim_end_matches('/').to_string());
        }
      }
      Ok(parts.join("/"))
    })?,
  )?;

  path.set(
    "basename",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  path.set(
    "dirname",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .parent()
          .map(|p| p.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // warble.path.exists(path) - Relative paths are taken from the current directory
  path.set(
    "exists",
    lua.create_function(|_, path_str: String| Ok(Path::new(&path_str).exists()))?,
  )?;

  Ok(path)
}
