//! Zip serialisation of a [`FileManifest`].

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::ArchiveError;
use super::manifest::{EntrySource, FileManifest};
use crate::consts::{MANIFEST_ENTRY, VERSION};

/// The manifest written when a project does not supply one.
pub fn default_manifest(main_class: Option<&str>) -> String {
  let mut manifest = format!("Manifest-Version: 1.0\nCreated-By: Warbler {}\n", VERSION);
  if let Some(class) = main_class {
    manifest.push_str(&format!("Main-Class: {}\n", class));
  }
  manifest.push('\n');
  manifest
}

/// Add `META-INF/MANIFEST.MF` unless an entry of that name (in any case)
/// already exists: the configured manifest file when given, otherwise the
/// default manifest.
pub fn add_manifest(manifest: &mut FileManifest, manifest_file: Option<&Path>) {
  if manifest.contains_ignore_case(MANIFEST_ENTRY) {
    return;
  }
  let source = match manifest_file {
    Some(path) => EntrySource::File(path.to_path_buf()),
    None => EntrySource::blob(default_manifest(None)),
  };
  manifest.insert(MANIFEST_ENTRY, source);
}

/// Read one entry out of an existing zip archive.
pub fn read_entry(archive: &Path, name: &str) -> Result<Vec<u8>, ArchiveError> {
  let file = File::open(archive).map_err(|e| ArchiveError::Io {
    path: archive.to_path_buf(),
    source: e,
  })?;
  let mut zip = ZipArchive::new(io::BufReader::new(file)).map_err(|e| ArchiveError::Zip {
    path: archive.to_path_buf(),
    source: e,
  })?;
  let mut entry = zip.by_name(name).map_err(|e| ArchiveError::Zip {
    path: archive.to_path_buf(),
    source: e,
  })?;
  let mut bytes = Vec::new();
  entry.read_to_end(&mut bytes).map_err(|e| ArchiveError::Io {
    path: archive.to_path_buf(),
    source: e,
  })?;
  Ok(bytes)
}

/// Writes manifests out as zip archives.
///
/// Entries are written in path order with a fixed timestamp, so the same
/// inputs always produce the same bytes.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
  options: SimpleFileOptions,
}

impl Default for ArchiveBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl ArchiveBuilder {
  pub fn new() -> Self {
    let options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Deflated)
      .last_modified_time(DateTime::default());
    Self { options }
  }

  /// Store entries without compression.
  pub fn stored(mut self) -> Self {
    self.options = self.options.compression_method(CompressionMethod::Stored);
    self
  }

  /// Serialise into memory.
  pub fn build(&self, manifest: &mut FileManifest) -> Result<Vec<u8>, ArchiveError> {
    let cursor = self.write_to(manifest, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
  }

  /// Write to `path`, replacing any existing file.
  pub fn write(&self, manifest: &mut FileManifest, path: &Path) -> Result<(), ArchiveError> {
    if path.exists() {
      debug!(path = %path.display(), "removing existing archive");
      fs::remove_file(path).map_err(|e| ArchiveError::Io {
        path: path.to_path_buf(),
        source: e,
      })?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|e| ArchiveError::Io {
        path: parent.to_path_buf(),
        source: e,
      })?;
    }

    info!(path = %path.display(), entries = manifest.len(), "creating archive");
    let file = File::create(path).map_err(|e| ArchiveError::Io {
      path: path.to_path_buf(),
      source: e,
    })?;
    let mut file = self.write_to(manifest, file)?;
    file.flush().map_err(|e| ArchiveError::Io {
      path: path.to_path_buf(),
      source: e,
    })?;
    Ok(())
  }

  /// Serialise into any seekable writer, returning it when done.
  pub fn write_to<W: Write + Seek>(&self, manifest: &mut FileManifest, writer: W) -> Result<W, ArchiveError> {
    manifest.ensure_directory_entries();
    let mut zip = ZipWriter::new(writer);

    for (name, source) in manifest.iter() {
      match source {
        EntrySource::Directory => self.add_directory(&mut zip, name)?,
        EntrySource::Blob(bytes) => {
          zip.start_file(name.as_str(), self.options)?;
          zip.write_all(bytes).map_err(|e| ArchiveError::Write {
            entry: name.clone(),
            source: e,
          })?;
        }
        EntrySource::File(path) => {
          let metadata = fs::metadata(path).map_err(|_| ArchiveError::MissingSource {
            entry: name.clone(),
            path: path.clone(),
          })?;
          if metadata.is_dir() {
            if fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) {
              warn!(entry = %name, "directory symlinks are not followed; contents not in archive");
            }
            self.add_directory(&mut zip, name)?;
            continue;
          }
          // Symlinked files resolve to their target's contents.
          let mut file = File::open(path).map_err(|e| ArchiveError::Io {
            path: path.clone(),
            source: e,
          })?;
          zip.start_file(name.as_str(), self.options)?;
          io::copy(&mut file, &mut zip).map_err(|e| ArchiveError::Write {
            entry: name.clone(),
            source: e,
          })?;
        }
      }
    }

    Ok(zip.finish()?)
  }

  fn add_directory<W: Write + Seek>(&self, zip: &mut ZipWriter<W>, name: &str) -> Result<(), ArchiveError> {
    zip.add_directory(format!("{}/", name), self.options)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;
  use tempfile::TempDir;

  fn entry_names(bytes: &[u8]) -> Vec<String> {
    let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    zip.file_names().map(str::to_string).collect::<Vec<_>>()
  }

  fn read(bytes: &[u8], name: &str) -> String {
    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut out).unwrap();
    out
  }

  #[test]
  fn default_manifest_text() {
    assert_eq!(
      default_manifest(None),
      format!("Manifest-Version: 1.0\nCreated-By: Warbler {}\n\n", VERSION)
    );
    assert!(default_manifest(Some("JarMain")).ends_with("Main-Class: JarMain\n\n"));
  }

  #[test]
  fn add_manifest_respects_existing_entry() {
    let mut manifest = FileManifest::new();
    manifest.insert("meta-inf/Manifest.mf", EntrySource::blob("custom"));
    add_manifest(&mut manifest, None);
    assert!(!manifest.contains(MANIFEST_ENTRY));

    let mut manifest = FileManifest::new();
    add_manifest(&mut manifest, Some(Path::new("/project/MANIFEST.MF")));
    assert_eq!(
      manifest.get(MANIFEST_ENTRY),
      Some(&EntrySource::File(PathBuf::from("/project/MANIFEST.MF")))
    );
  }

  #[test]
  fn entries_are_sorted_with_parent_directories() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("user.rb");
    fs::write(&source, "class User; end").unwrap();

    let mut manifest = FileManifest::new();
    manifest.insert("WEB-INF/app/models/user.rb", EntrySource::File(source));
    manifest.insert("index.html", EntrySource::blob("<html/>"));
    manifest.insert("WEB-INF/lib", EntrySource::Directory);

    let bytes = ArchiveBuilder::new().build(&mut manifest).unwrap();
    let mut names = entry_names(&bytes);
    names.sort();
    assert_eq!(
      names,
      vec![
        "WEB-INF/",
        "WEB-INF/app/",
        "WEB-INF/app/models/",
        "WEB-INF/app/models/user.rb",
        "WEB-INF/lib/",
        "index.html",
      ]
    );
    assert_eq!(read(&bytes, "WEB-INF/app/models/user.rb"), "class User; end");
    assert_eq!(read(&bytes, "index.html"), "<html/>");
  }

  #[test]
  fn identical_inputs_produce_identical_bytes() {
    let mut a = FileManifest::new();
    a.insert("b.txt", EntrySource::blob("b"));
    a.insert("a.txt", EntrySource::blob("a"));
    let mut b = a.clone();
    let builder = ArchiveBuilder::new();
    assert_eq!(builder.build(&mut a).unwrap(), builder.build(&mut b).unwrap());
  }

  #[test]
  fn missing_source_is_fatal() {
    let mut manifest = FileManifest::new();
    manifest.insert("gone.rb", EntrySource::File(PathBuf::from("/definitely/not/here.rb")));
    let err = ArchiveBuilder::new().build(&mut manifest).unwrap_err();
    assert!(matches!(err, ArchiveError::MissingSource { ref entry, .. } if entry == "gone.rb"));
  }

  #[test]
  fn write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("out").join("app.war");
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    fs::write(&dest, "stale").unwrap();

    let mut manifest = FileManifest::new();
    manifest.insert("x.txt", EntrySource::blob("fresh"));
    ArchiveBuilder::new().write(&mut manifest, &dest).unwrap();

    assert_eq!(read_entry(&dest, "x.txt").unwrap(), b"fresh");
    assert!(matches!(read_entry(&dest, "nope"), Err(ArchiveError::Zip { .. })));
  }

  #[cfg(unix)]
  #[test]
  #[tracing_test::traced_test]
  fn directory_symlinks_become_empty_directories() {
    let temp = TempDir::new().unwrap();
    let real = temp.path().join("real");
    fs::create_dir_all(&real).unwrap();
    fs::write(real.join("inner.txt"), "inner").unwrap();
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let file_link = temp.path().join("file-link");
    std::os::unix::fs::symlink(real.join("inner.txt"), &file_link).unwrap();

    let mut manifest = FileManifest::new();
    manifest.insert("app/link", EntrySource::File(link));
    manifest.insert("app/file-link", EntrySource::File(file_link));
    let bytes = ArchiveBuilder::new().build(&mut manifest).unwrap();

    let mut names = entry_names(&bytes);
    names.sort();
    assert_eq!(names, vec!["app/", "app/file-link", "app/link/"]);
    assert_eq!(read(&bytes, "app/file-link"), "inner");
    assert!(logs_contain("directory symlinks are not followed"));
  }
}
