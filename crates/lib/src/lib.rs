//! warbler-lib: packaging Ruby applications as JRuby jar and war archives.
//!
//! A packaging run loads an [`application::Application`]: the project's
//! [`traits`] are detected and configure it together with the user's
//! `config/warble.lua`, after which a [`jar::Jar`] gathers the application
//! files, gems and generated entries into a [`archive::FileManifest`] that
//! is written out as a zip archive.

pub mod application;
pub mod archive;
pub mod bundler;
pub mod collect;
pub mod compile;
pub mod config;
pub mod consts;
pub mod gems;
pub mod init;
pub mod init_script;
pub mod jar;
pub mod lua;
pub mod pathmap;
pub mod traits;
pub mod webxml;

#[cfg(test)]
mod util;
