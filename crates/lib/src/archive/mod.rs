//! Archive contents and zip output.

mod builder;
mod manifest;

use std::path::PathBuf;

use thiserror::Error;

pub use builder::{ArchiveBuilder, add_manifest, default_manifest, read_entry};
pub use manifest::{EntrySource, FileManifest};

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("source for '{entry}' not found: {}", path.display())]
  MissingSource { entry: String, path: PathBuf },

  #[error("I/O error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write entry '{entry}': {source}")]
  Write {
    entry: String,
    #[source]
    source: std::io::Error,
  },

  #[error("zip error in {}: {source}", path.display())]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error(transparent)]
  Encode(#[from] zip::result::ZipError),
}
