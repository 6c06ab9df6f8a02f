use std::path::Path;

use mlua::prelude::*;

use crate::lua::globals::{self, ProjectInfo};

/// Create a new Lua runtime with the `warble` global registered.
///
/// `package.path` is extended with the project's `config/lua` directory so
/// configuration files can `require` local helpers.
pub fn create_runtime(info: &ProjectInfo) -> LuaResult<Lua> {
  let lua = Lua::new();
  let package = lua.globals().get::<LuaTable>("package")?;
  let package_path = package.get::<String>("path")?;
  let config_lua = info.dir.join("config").join("lua");
  let new_package_path = format!(
    "{0}/?.lua;{0}/?/init.lua;{1}",
    config_lua.to_string_lossy(),
    package_path
  );
  package.set("path", new_package_path)?;

  globals::register_globals(&lua, info)?;

  Ok(lua)
}

/// Load and execute a Lua file, returning whatever the chunk returns.
pub fn load_file(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  let canonical_path = dunce::canonicalize(path)
    .map_err(|e| LuaError::external(format!("cannot canonicalize '{}': {}", path.display(), e)))?;
  let content = std::fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .eval::<LuaValue>()
}
