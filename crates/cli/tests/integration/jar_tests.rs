//! Executable jar packaging.

use predicates::prelude::*;

use super::common::{TestEnv, entries, entry_text};

#[test]
fn plain_project_builds_a_jar() {
  let env = TestEnv::new("tool");
  env.install_gem("rake", "13.0.6", &[], &["lib/rake.rb"]);
  env.write_file("bin/tool", "require 'tool'\n");
  env.write_file("lib/tool.rb", "puts 'tool'\n");
  env.write_file(
    "config/warble.lua",
    "return function(config) table.insert(config.gems, 'rake'); table.insert(config.gems, 'rake') end",
  );

  env
    .warble_cmd()
    .arg("jar")
    .assert()
    .success()
    .stdout(predicate::str::contains("tool.jar"));

  let jar = env.project.join("tool.jar");
  let names = entries(&jar);
  assert!(names.contains(&"tool/bin/tool".to_string()));
  assert!(names.contains(&"tool/lib/tool.rb".to_string()));
  assert!(names.contains(&"META-INF/gems/gems/rake-13.0.6/lib/rake.rb".to_string()));
  assert_eq!(
    names.iter().filter(|n| *n == "META-INF/gems/specifications/rake-13.0.6.gemspec").count(),
    1
  );

  assert_eq!(entry_text(&jar, "META-INF/main.rb"), "load 'tool/bin/tool'");
  let init = entry_text(&jar, "META-INF/init.rb");
  assert!(init.contains("ENV['GEM_HOME']"));
  assert!(init.contains("$LOAD_PATH.unshift __FILE__.sub(/!.*/, '!/tool/lib')"));
}

#[test]
fn project_without_bin_script_fails() {
  let env = TestEnv::new("lib-only");
  env.write_file("lib/thing.rb", "");
  env
    .warble_cmd()
    .arg("jar")
    .assert()
    .failure()
    .stderr(predicate::str::contains("no executable script"));
}

#[test]
fn autodeploy_dir_receives_the_archive() {
  let env = TestEnv::new("tool");
  env.write_file("bin/tool", "");
  env.write_file(
    "config/warble.lua",
    "return function(config) config.autodeploy_dir = 'dist' end",
  );
  env.warble_cmd().arg("jar").assert().success();
  assert!(env.project.join("dist/tool.jar").is_file());
}
