//! Web application packaging.

use predicates::prelude::*;

use super::common::{TestEnv, entries, entry_text};

fn rails_app() -> TestEnv {
  let env = TestEnv::new("blog");
  env.install_gem("rails", "7.1.0", &[("rack", ">= 2.2")], &["lib/rails.rb"]);
  env.install_gem("rack", "2.2.8", &[], &["lib/rack.rb", "test/spec_rack.rb"]);
  env.write_file("app/controllers/posts_controller.rb", "class PostsController; end\n");
  env.write_file("config/environment.rb", "# boot\n");
  env.write_file("lib/tasks/db.rake", "");
  env.write_file("log/production.log", "noise\n");
  env.write_file("vendor/test.log", "noise\n");
  env.write_file("public/index.html", "<html></html>\n");
  env
}

#[test]
fn rails_app_builds_a_war() {
  let env = rails_app();
  env
    .warble_cmd()
    .arg("war")
    .assert()
    .success()
    .stdout(predicate::str::contains("blog.war"));

  let war = env.project.join("blog.war");
  let names = entries(&war);
  for expected in [
    "WEB-INF/app/",
    "WEB-INF/config/",
    "WEB-INF/lib/",
    "WEB-INF/app/controllers/posts_controller.rb",
    "WEB-INF/config/environment.rb",
    "WEB-INF/web.xml",
    "WEB-INF/gems/specifications/rails-7.1.0.gemspec",
    "WEB-INF/gems/specifications/rack-2.2.8.gemspec",
    "WEB-INF/gems/gems/rack-2.2.8/lib/rack.rb",
    "index.html",
    "META-INF/MANIFEST.MF",
    "META-INF/init.rb",
  ] {
    assert!(names.iter().any(|n| n == expected), "missing {expected} in {names:?}");
  }
  assert!(!names.iter().any(|n| n.ends_with(".log")));

  let web_xml = entry_text(&war, "WEB-INF/web.xml");
  assert!(web_xml.contains("<param-name>rails.env</param-name>"));
  assert!(web_xml.contains("<param-value>production</param-value>"));

  let init = entry_text(&war, "META-INF/init.rb");
  assert!(init.contains("$servlet_context.getRealPath('/WEB-INF/gems')"));
  assert!(init.contains("ENV['RAILS_ENV'] ||= 'production'"));
}

#[test]
fn rails_env_is_taken_from_the_environment() {
  let env = rails_app();
  env.warble_cmd().env("RAILS_ENV", "staging").arg("war").assert().success();
  let web_xml = entry_text(&env.project.join("blog.war"), "WEB-INF/web.xml");
  assert!(web_xml.contains("<param-value>staging</param-value>"));
}

#[test]
fn logs_can_be_kept_while_excluding_one() {
  let env = rails_app();
  env.write_file(
    "config/warble.lua",
    r#"
return function(config)
  config.exclude_logs = false
  table.insert(config.excludes, "**/test.log")
end
"#,
  );
  env.warble_cmd().arg("war").assert().success();

  let names = entries(&env.project.join("blog.war"));
  assert!(names.contains(&"WEB-INF/log/production.log".to_string()));
  assert!(!names.contains(&"WEB-INF/vendor/test.log".to_string()));
}

#[test]
fn gem_excludes_and_gemjar() {
  let env = rails_app();
  env.write_file(
    "config/warble.lua",
    r#"return function(config) config.gem_excludes = { "^test/" } end"#,
  );
  env.warble_cmd().args(["war", "--feature", "gemjar"]).assert().success();

  let war = env.project.join("blog.war");
  let names = entries(&war);
  assert!(names.contains(&"WEB-INF/lib/gems.jar".to_string()));
  assert!(!names.iter().any(|n| n.starts_with("WEB-INF/gems/")));
}

#[test]
fn executable_war_without_web_server_fails() {
  let env = rails_app();
  env
    .warble_cmd()
    .args(["war", "--feature", "executable"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("webserver_jar"));
}

#[test]
fn rack_app_builds_a_war() {
  let env = TestEnv::new("hello");
  env.write_file("config.ru", "run ->(env) { [200, {}, ['hi']] }\n");
  env.write_file("app.rb", "");
  env.warble_cmd().arg("war").assert().success();

  let war = env.project.join("hello.war");
  let names = entries(&war);
  assert!(names.contains(&"WEB-INF/config.ru".to_string()));
  let init = entry_text(&war, "META-INF/init.rb");
  assert!(init.contains("ENV['RACK_ENV'] ||= 'production'"));
}
