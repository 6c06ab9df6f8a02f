//! Lua runtime and evaluation of `config/warble.lua`.
//!
//! # Submodules
//!
//! - [`eval`] - Loading the configuration file and running its user block
//! - [`globals`] - The `warble` global table
//! - [`runtime`] - Low-level Lua VM management

pub mod eval;
pub mod globals;
pub mod runtime;

pub use eval::{LuaConfigError, evaluate_config};
