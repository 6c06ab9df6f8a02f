//! The in-memory listing of everything that goes into an archive.

use std::collections::{BTreeMap, BTreeSet};
use std::collections::btree_map;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Where the bytes of an archive entry come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
  /// A directory entry with no contents.
  Directory,
  /// Contents generated in memory.
  Blob(Vec<u8>),
  /// A file (or directory) on disk.
  File(PathBuf),
}

impl EntrySource {
  pub fn blob(contents: impl Into<Vec<u8>>) -> Self {
    EntrySource::Blob(contents.into())
  }

  pub fn is_directory(&self) -> bool {
    matches!(self, EntrySource::Directory)
  }
}

/// Archive path to entry source, ordered by path.
///
/// Paths use `/` separators and carry no trailing slash, including for
/// directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
  entries: BTreeMap<String, EntrySource>,
}

impl FileManifest {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or replace an entry, returning the previous source.
  pub fn insert(&mut self, path: impl Into<String>, source: EntrySource) -> Option<EntrySource> {
    let path = path.into();
    let path = path.trim_end_matches('/').to_string();
    self.entries.insert(path, source)
  }

  pub fn get(&self, path: &str) -> Option<&EntrySource> {
    self.entries.get(path)
  }

  pub fn contains(&self, path: &str) -> bool {
    self.entries.contains_key(path)
  }

  /// Whether an entry exists with a name equal to `path` ignoring ASCII case.
  pub fn contains_ignore_case(&self, path: &str) -> bool {
    self.entries.keys().any(|k| k.eq_ignore_ascii_case(path))
  }

  pub fn remove(&mut self, path: &str) -> Option<EntrySource> {
    self.entries.remove(path)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, EntrySource> {
    self.entries.iter()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  /// Keep only the entries for which `keep` returns true.
  pub fn retain(&mut self, mut keep: impl FnMut(&str, &EntrySource) -> bool) {
    self.entries.retain(|k, v| keep(k, v));
  }

  /// Move entries out of the manifest, returning those matched by `take`.
  pub fn extract(&mut self, mut take: impl FnMut(&str, &EntrySource) -> bool) -> FileManifest {
    let (taken, kept): (BTreeMap<_, _>, BTreeMap<_, _>) =
      std::mem::take(&mut self.entries).into_iter().partition(|(k, v)| take(k, v));
    self.entries = kept;
    FileManifest { entries: taken }
  }

  /// Rewrite every key with `rename`; later keys win on collisions.
  pub fn rename_all(&mut self, mut rename: impl FnMut(&str) -> String) {
    self.entries = std::mem::take(&mut self.entries)
      .into_iter()
      .map(|(k, v)| (rename(&k), v))
      .collect();
  }

  /// The bytes an entry would be written with; empty for directories.
  pub fn contents(&self, path: &str) -> io::Result<Option<Vec<u8>>> {
    match self.entries.get(path) {
      None => Ok(None),
      Some(EntrySource::Directory) => Ok(Some(Vec::new())),
      Some(EntrySource::Blob(bytes)) => Ok(Some(bytes.clone())),
      Some(EntrySource::File(source)) => fs::read(source).map(Some),
    }
  }

  /// Add a directory entry for every missing ancestor of every entry, up to
  /// the archive root.
  pub fn ensure_directory_entries(&mut self) {
    let mut missing = BTreeSet::new();
    for path in self.entries.keys() {
      let mut dir = parent(path);
      while let Some(d) = dir {
        if !self.entries.contains_key(d) {
          missing.insert(d.to_string());
        }
        dir = parent(d);
      }
    }
    for dir in missing {
      self.entries.insert(dir, EntrySource::Directory);
    }
  }
}

impl<'a> IntoIterator for &'a FileManifest {
  type Item = (&'a String, &'a EntrySource);
  type IntoIter = btree_map::Iter<'a, String, EntrySource>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}

impl IntoIterator for FileManifest {
  type Item = (String, EntrySource);
  type IntoIter = btree_map::IntoIter<String, EntrySource>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}

fn parent(path: &str) -> Option<&str> {
  path.rfind('/').map(|idx| &path[..idx]).filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parents_are_synthesised_once() {
    let mut manifest = FileManifest::new();
    manifest.insert("WEB-INF/gems/gems/rake-13.0.6/lib/rake.rb", EntrySource::blob("x"));
    manifest.insert("WEB-INF/gems/specifications/rake-13.0.6.gemspec", EntrySource::blob("y"));
    manifest.insert("index.html", EntrySource::blob("<html/>"));
    manifest.ensure_directory_entries();

    let keys: Vec<_> = manifest.keys().collect();
    assert_eq!(
      keys,
      vec![
        "WEB-INF",
        "WEB-INF/gems",
        "WEB-INF/gems/gems",
        "WEB-INF/gems/gems/rake-13.0.6",
        "WEB-INF/gems/gems/rake-13.0.6/lib",
        "WEB-INF/gems/gems/rake-13.0.6/lib/rake.rb",
        "WEB-INF/gems/specifications",
        "WEB-INF/gems/specifications/rake-13.0.6.gemspec",
        "index.html",
      ]
    );
    assert_eq!(manifest.get("WEB-INF/gems"), Some(&EntrySource::Directory));
  }

  #[test]
  fn directory_entries_get_parents_too() {
    let mut manifest = FileManifest::new();
    manifest.insert("a/b/", EntrySource::Directory);
    manifest.ensure_directory_entries();
    assert_eq!(manifest.keys().collect::<Vec<_>>(), vec!["a", "a/b"]);
  }

  #[test]
  fn existing_directory_marker_does_not_stop_the_walk() {
    let mut manifest = FileManifest::new();
    manifest.insert("myapp/lib", EntrySource::Directory);
    manifest.insert("myapp/lib/tool.rb", EntrySource::blob("puts 1"));
    manifest.ensure_directory_entries();
    assert_eq!(manifest.get("myapp"), Some(&EntrySource::Directory));
    assert_eq!(manifest.keys().collect::<Vec<_>>(), vec!["myapp", "myapp/lib", "myapp/lib/tool.rb"]);
  }

  #[test]
  fn existing_entries_are_not_replaced() {
    let mut manifest = FileManifest::new();
    manifest.insert("lib", EntrySource::File(PathBuf::from("/project/lib")));
    manifest.insert("lib/a.rb", EntrySource::blob("a"));
    manifest.ensure_directory_entries();
    assert_eq!(manifest.get("lib"), Some(&EntrySource::File(PathBuf::from("/project/lib"))));
  }

  #[test]
  fn case_insensitive_lookup() {
    let mut manifest = FileManifest::new();
    manifest.insert("meta-inf/manifest.mf", EntrySource::blob("Manifest-Version: 1.0\n"));
    assert!(manifest.contains_ignore_case("META-INF/MANIFEST.MF"));
    assert!(!manifest.contains("META-INF/MANIFEST.MF"));
  }

  #[test]
  fn extract_and_rename() {
    let mut manifest = FileManifest::new();
    manifest.insert("WEB-INF/WEB-INF/app/a.class", EntrySource::blob("a"));
    manifest.insert("WEB-INF/gems/x.rb", EntrySource::blob("x"));
    manifest.insert("index.html", EntrySource::blob("i"));

    let gems = manifest.extract(|k, _| k.starts_with("WEB-INF/gems/"));
    assert_eq!(gems.keys().collect::<Vec<_>>(), vec!["WEB-INF/gems/x.rb"]);
    assert_eq!(manifest.len(), 2);

    manifest.rename_all(|k| k.replacen("WEB-INF/WEB-INF", "WEB-INF", 1));
    assert!(manifest.contains("WEB-INF/app/a.class"));
  }

  #[test]
  fn contents_reads_files_and_blobs() {
    let temp = tempfile::TempDir::new().unwrap();
    let file = temp.path().join("a.txt");
    fs::write(&file, "on disk").unwrap();

    let mut manifest = FileManifest::new();
    manifest.insert("a.txt", EntrySource::File(file));
    manifest.insert("b.txt", EntrySource::blob("in memory"));
    manifest.insert("dir", EntrySource::Directory);

    assert_eq!(manifest.contents("a.txt").unwrap().unwrap(), b"on disk");
    assert_eq!(manifest.contents("b.txt").unwrap().unwrap(), b"in memory");
    assert_eq!(manifest.contents("dir").unwrap().unwrap(), b"");
    assert!(manifest.contents("missing").unwrap().is_none());
  }
}
