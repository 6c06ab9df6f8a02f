//! Shared test helpers for CLI integration tests.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the project, an
/// installed gem home and an (empty) tool installation directory.
pub struct TestEnv {
  pub temp: TempDir,
  pub project: PathBuf,
}

impl TestEnv {
  /// An empty project called `name`.
  pub fn new(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join(name);
    fs::create_dir_all(&project).unwrap();
    Self { temp, project }
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.project.join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  pub fn gem_home(&self) -> PathBuf {
    self.temp.path().join("gem-home")
  }

  /// Install a gem specification and its files into the gem home.
  pub fn install_gem(&self, name: &str, version: &str, deps: &[(&str, &str)], files: &[&str]) {
    let full_name = format!("{}-{}", name, version);
    let mut spec = format!(
      "Gem::Specification.new do |s|\n  s.name = \"{}\"\n  s.version = \"{}\"\n",
      name, version
    );
    for (dep, requirement) in deps {
      spec.push_str(&format!("  s.add_runtime_dependency(%q<{}>, [\"{}\"])\n", dep, requirement));
    }
    spec.push_str("end\n");

    let spec_dir = self.gem_home().join("specifications");
    fs::create_dir_all(&spec_dir).unwrap();
    fs::write(spec_dir.join(format!("{}.gemspec", full_name)), spec).unwrap();

    let gem_dir = self.gem_home().join("gems").join(&full_name);
    for file in files {
      let path = gem_dir.join(file);
      fs::create_dir_all(path.parent().unwrap()).unwrap();
      fs::write(path, format!("# {}\n", file)).unwrap();
    }
    fs::create_dir_all(&gem_dir).unwrap();
  }

  /// A warble command run in the project directory with an isolated
  /// environment.
  pub fn warble_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("warble");
    cmd
      .current_dir(&self.project)
      .env("GEM_HOME", self.gem_home())
      .env("GEM_PATH", "")
      .env("WARBLER_HOME", self.temp.path().join("warbler-home"))
      .env_remove("RAILS_ENV")
      .env_remove("RACK_ENV")
      .env_remove("BUNDLE_GEMFILE")
      .env_remove("RUST_LOG");
    cmd
  }
}

/// Entry names of a zip archive.
pub fn entries(path: &Path) -> Vec<String> {
  let zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
  zip.file_names().map(str::to_string).collect()
}

/// Contents of one archive entry as text.
pub fn entry_text(path: &Path, name: &str) -> String {
  let mut zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
  let mut entry = zip.by_name(name).unwrap();
  let mut text = String::new();
  entry.read_to_string(&mut text).unwrap();
  text
}
