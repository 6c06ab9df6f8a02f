//! Test fixtures: project trees, installed gems and a launcher jar.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Write `(relative path, contents)` pairs under `root`, creating parents.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
  for (rel, contents) in files {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }
}

/// Install a fake gem into `gem_home`: a specification file plus the given
/// files under `gems/<name>-<version>/`.
///
/// `deps` are `(name, requirement)` runtime dependencies.
pub fn install_gem(gem_home: &Path, name: &str, version: &str, deps: &[(&str, &str)], files: &[&str]) -> PathBuf {
  let full_name = format!("{}-{}", name, version);
  let mut spec = format!(
    "Gem::Specification.new do |s|\n  s.name = \"{}\".freeze\n  s.version = \"{}\"\n",
    name, version
  );
  if !files.is_empty() {
    let list: Vec<String> = files.iter().map(|f| format!("\"{}\".freeze", f)).collect();
    spec.push_str(&format!("  s.files = [{}]\n", list.join(", ")));
  }
  for (dep, requirement) in deps {
    spec.push_str(&format!(
      "  s.add_runtime_dependency(%q<{}>.freeze, [\"{}\"])\n",
      dep, requirement
    ));
  }
  spec.push_str("end\n");

  let spec_dir = gem_home.join("specifications");
  fs::create_dir_all(&spec_dir).unwrap();
  let spec_path = spec_dir.join(format!("{}.gemspec", full_name));
  fs::write(&spec_path, spec).unwrap();

  let gem_dir = gem_home.join("gems").join(&full_name);
  fs::create_dir_all(&gem_dir).unwrap();
  for file in files {
    let path = gem_dir.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("# {}\n", file)).unwrap();
  }
  spec_path
}

/// A launcher jar holding stub `JarMain.class` and `WarMain.class` entries.
pub fn support_jar(dir: &Path) -> PathBuf {
  let path = dir.join("warbler_jar.jar");
  let file = fs::File::create(&path).unwrap();
  let mut zip = ZipWriter::new(file);
  for class in ["JarMain.class", "WarMain.class"] {
    zip.start_file(class, SimpleFileOptions::default()).unwrap();
    zip.write_all(format!("stub {}", class).as_bytes()).unwrap();
  }
  zip.finish().unwrap();
  path
}

/// Names of the entries in a zip archive, in stored order.
pub fn archive_entries(path: &Path) -> Vec<String> {
  let file = fs::File::open(path).unwrap();
  let zip = zip::ZipArchive::new(file).unwrap();
  zip.file_names().map(str::to_string).collect()
}
