//! `META-INF/init.rb` generation.
//!
//! The bootstrap script runs before the application inside the archive. It
//! is assembled from the configured fragments in order, followed by one
//! `$LOAD_PATH` line per configured load path.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::config::{Config, InitFragment, InitTemplate};
use crate::pathmap::{PathmapError, category};
use crate::webxml;

#[derive(Debug, Error)]
pub enum InitScriptError {
  #[error("failed to read init fragment {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Pathmap(#[from] PathmapError),
}

/// The init script, or `None` when there is nothing to put in it.
pub fn render(project_dir: &Path, config: &Config) -> Result<Option<String>, InitScriptError> {
  if config.init_contents.is_empty() && config.load_paths.is_empty() {
    return Ok(None);
  }

  let mut script = String::new();
  for fragment in &config.init_contents {
    let text = match fragment {
      InitFragment::Text(text) => text.clone(),
      InitFragment::File(path) => {
        let full = project_dir.join(path);
        let contents = fs::read_to_string(&full).map_err(|e| InitScriptError::Read { path: full, source: e })?;
        if path.extension().is_some_and(|ext| ext == "erb") {
          webxml::expand_template(&contents, config)
        } else {
          contents
        }
      }
      InitFragment::Template(template) => render_template(*template, config)?,
    };
    script.push_str(&text);
    if !script.ends_with('\n') {
      script.push('\n');
    }
  }

  for path in &config.load_paths {
    script.push_str(&format!("$LOAD_PATH.unshift __FILE__.sub(/!.*/, '!/{}')\n", path));
  }

  Ok(Some(script))
}

fn gem_home_operator(config: &Config) -> &'static str {
  if config.override_gem_home { "=" } else { "||=" }
}

fn env_value(config: &Config, path: &[&str], default: &str) -> String {
  config
    .webxml_value(path)
    .and_then(Value::as_str)
    .unwrap_or(default)
    .to_string()
}

fn render_template(template: InitTemplate, config: &Config) -> Result<String, PathmapError> {
  let text = match template {
    InitTemplate::Jar => {
      let mut text = format!(
        "ENV['GEM_HOME'] {} File.expand_path(File.join('..', '..', '{}'), __FILE__)\n",
        gem_home_operator(config),
        config.gem_path
      );
      if config.bundler {
        let gemfile = config.pathmaps.apply(category::APPLICATION, "Gemfile")?;
        text.push_str(&format!(
          "ENV['BUNDLE_GEMFILE'] ||= File.expand_path(File.join('..', '..', '{}'), __FILE__)\n",
          gemfile
        ));
      }
      text
    }
    InitTemplate::War => {
      let mut text = format!(
        "ENV['GEM_HOME'] {} $servlet_context.getRealPath('{}')\n",
        gem_home_operator(config),
        config.gem_path
      );
      if config.bundler {
        let gemfile = config.pathmaps.apply(category::APPLICATION, "Gemfile")?;
        text.push_str(&format!(
          "ENV['BUNDLE_GEMFILE'] ||= $servlet_context.getRealPath('/{}')\n",
          gemfile
        ));
      }
      text
    }
    InitTemplate::Rails => format!(
      "ENV['RAILS_ENV'] ||= '{}'\n",
      env_value(config, &["rails", "env"], "production")
    ),
    InitTemplate::Rack => format!(
      "ENV['RACK_ENV'] ||= '{}'\n",
      env_value(config, &["rack", "env"], "production")
    ),
    InitTemplate::JBundler => "ENV['JBUNDLE_SKIP'] = 'true'\n".to_string(),
  };
  Ok(text)
}
