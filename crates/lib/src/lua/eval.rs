//! Configuration file evaluation.
//!
//! `config/warble.lua` returns a function. It is called once with the
//! configuration as a plain table, after the traits' `before_configure`
//! hooks and before their `after_configure` hooks:
//!
//! ```lua
//! return function(config)
//!   config.jar_name = "blog"
//!   table.insert(config.gems, { name = "jruby-openssl", version = ">= 0.9" })
//!   table.insert(config.excludes, "lib/secret.rb")
//!   config.webxml.jruby = { max = { runtimes = 4 } }
//! end
//! ```
//!
//! Mutations of the table are read back. A function that returns a table
//! replaces the configuration with it instead.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::lua::globals::ProjectInfo;
use crate::lua::runtime;

#[derive(Debug, Error)]
pub enum LuaConfigError {
  #[error("failed to evaluate {}: {source}", path.display())]
  Eval {
    path: PathBuf,
    #[source]
    source: LuaError,
  },

  #[error("{} must return a function taking the configuration table", path.display())]
  NotAFunction { path: PathBuf },

  #[error("invalid configuration produced by {}: {source}", path.display())]
  Invalid {
    path: PathBuf,
    #[source]
    source: LuaError,
  },
}

/// Run the user block in `path` against `config`.
///
/// A missing file leaves the configuration untouched.
pub fn evaluate_config(path: &Path, info: &ProjectInfo, config: Config) -> Result<Config, LuaConfigError> {
  if !path.is_file() {
    debug!(path = %path.display(), "no configuration file; using defaults");
    return Ok(config);
  }
  info!(path = %path.display(), "evaluating configuration");

  let eval_err = |source: LuaError| LuaConfigError::Eval {
    path: path.to_path_buf(),
    source,
  };

  let lua = runtime::create_runtime(info).map_err(eval_err)?;
  let block = match runtime::load_file(&lua, path).map_err(eval_err)? {
    LuaValue::Function(f) => f,
    _ => {
      return Err(LuaConfigError::NotAFunction {
        path: path.to_path_buf(),
      });
    }
  };

  let options = LuaSerializeOptions::new().serialize_none_to_null(false);
  let table = lua.to_value_with(&config, options).map_err(eval_err)?;
  let returned: LuaValue = block.call(table.clone()).map_err(eval_err)?;

  let result = match returned {
    LuaValue::Table(_) => returned,
    _ => table,
  };
  lua.from_value::<Config>(result).map_err(|source| LuaConfigError::Invalid {
    path: path.to_path_buf(),
    source,
  })
}
