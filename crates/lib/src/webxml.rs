//! Servlet deployment descriptor generation.
//!
//! The `webxml` configuration table becomes `<context-param>` entries: nested
//! tables are flattened with dot-joined keys (`rails.env`), keys listed under
//! `webxml.ignored` are dropped, and everything is XML-escaped.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::config::Config;

const IGNORED_KEY: &str = "ignored";

/// Listener class for the configured booter.
pub fn servlet_context_listener(booter: Option<&str>) -> &'static str {
  match booter {
    Some("rack") => "org.jruby.rack.RackServletContextListener",
    Some("merb") => "org.jruby.rack.merb.MerbServletContextListener",
    _ => "org.jruby.rack.rails.RailsServletContextListener",
  }
}

/// Flattened, unescaped context parameters.
pub fn context_params(webxml: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
  let mut ignored: Vec<String> = vec![IGNORED_KEY.to_string()];
  if let Some(Value::Array(list)) = webxml.get(IGNORED_KEY) {
    ignored.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
  }

  let mut params = BTreeMap::new();
  for (key, value) in webxml {
    if ignored.contains(key) {
      continue;
    }
    flatten(key, value, &mut params);
  }
  params
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
  match value {
    Value::Object(map) => {
      for (k, v) in map {
        flatten(&format!("{}.{}", prefix, k), v, out);
      }
    }
    Value::Null => {}
    other => {
      out.insert(prefix.to_string(), scalar(other));
    }
  }
}

fn scalar(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

pub fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

/// The generated `web.xml` for a war.
pub fn render(config: &Config) -> String {
  let mut xml = String::new();
  xml.push_str("<!DOCTYPE web-app PUBLIC\n");
  xml.push_str("  \"-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN\"\n");
  xml.push_str("  \"http://java.sun.com/dtd/web-app_2_3.dtd\">\n");
  xml.push_str("<web-app>\n");

  for (name, value) in context_params(&config.webxml) {
    xml.push_str(&format!(
      "  <context-param>\n    <param-name>{}</param-name>\n    <param-value>{}</param-value>\n  </context-param>\n\n",
      escape(&name),
      escape(&value)
    ));
  }

  xml.push_str("  <filter>\n    <filter-name>RackFilter</filter-name>\n");
  xml.push_str("    <filter-class>org.jruby.rack.RackFilter</filter-class>\n  </filter>\n");
  xml.push_str("  <filter-mapping>\n    <filter-name>RackFilter</filter-name>\n");
  xml.push_str("    <url-pattern>/*</url-pattern>\n  </filter-mapping>\n\n");

  xml.push_str(&format!(
    "  <listener>\n    <listener-class>{}</listener-class>\n  </listener>\n",
    servlet_context_listener(config.booter())
  ));

  for resource in jndi_resources(config) {
    xml.push_str(&format!(
      "\n  <resource-ref>\n    <res-ref-name>{}</res-ref-name>\n    <res-type>javax.sql.DataSource</res-type>\n    <res-auth>Container</res-auth>\n  </resource-ref>\n",
      escape(&resource)
    ));
  }

  xml.push_str("</web-app>\n");
  xml
}

fn jndi_resources(config: &Config) -> Vec<String> {
  match config.webxml.get("jndi") {
    Some(Value::String(name)) => vec![name.clone()],
    Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).map(str::to_string).collect(),
    _ => Vec::new(),
  }
}

/// Expand `<%= webxml.key.path %>` references in a template.
///
/// `webxml.servlet_context_listener` and `webxml.context_params` are also
/// recognised. Other ERB constructs are left in place with a warning.
pub fn expand_template(template: &str, config: &Config) -> String {
  let Ok(reference) = Regex::new(r"<%=\s*webxml((?:\.[A-Za-z_][A-Za-z0-9_]*)+)\s*%>") else {
    return template.to_string();
  };

  let expanded = reference.replace_all(template, |caps: &regex::Captures<'_>| {
    let path: Vec<&str> = caps[1].trim_start_matches('.').split('.').collect();
    match path.as_slice() {
      ["servlet_context_listener"] => servlet_context_listener(config.booter()).to_string(),
      ["context_params"] => context_params(&config.webxml)
        .into_iter()
        .map(|(k, v)| format!("{}={}", escape(&k), escape(&v)))
        .collect::<Vec<_>>()
        .join("\n"),
      _ => match config.webxml_value(&path) {
        Some(value) => escape(&scalar(value)),
        None => format!("No value for '{}' found", path.join(".")),
      },
    }
  });

  if expanded.contains("<%") {
    warn!("template contains ERB code that is not expanded");
  }
  expanded.into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn config_with(webxml: Value) -> Config {
    let mut config = Config::default();
    config.webxml = serde_json::from_value(webxml).unwrap();
    config
  }

  #[test]
  fn nested_values_flatten_with_dots() {
    let config = config_with(json!({
      "rails": { "env": "production" },
      "public": { "root": "/" },
      "jruby": { "max": { "runtimes": 4 } },
      "booter": "rails",
      "ignored": ["jndi", "booter"],
      "jndi": "jdbc/app",
    }));
    let params = context_params(&config.webxml);
    assert_eq!(
      params.into_iter().collect::<Vec<_>>(),
      vec![
        ("jruby.max.runtimes".to_string(), "4".to_string()),
        ("public.root".to_string(), "/".to_string()),
        ("rails.env".to_string(), "production".to_string()),
      ]
    );
  }

  #[test]
  fn listener_follows_booter() {
    assert_eq!(servlet_context_listener(Some("rack")), "org.jruby.rack.RackServletContextListener");
    assert_eq!(
      servlet_context_listener(Some("merb")),
      "org.jruby.rack.merb.MerbServletContextListener"
    );
    assert_eq!(
      servlet_context_listener(None),
      "org.jruby.rack.rails.RailsServletContextListener"
    );
  }

  #[test]
  fn render_escapes_and_lists_resources() {
    let config = config_with(json!({
      "app": { "title": "Tom & Jerry <live>" },
      "booter": "rack",
      "ignored": ["jndi", "booter"],
      "jndi": ["jdbc/main", "jdbc/audit"],
    }));
    let xml = render(&config);
    assert!(xml.contains("<param-name>app.title</param-name>"));
    assert!(xml.contains("<param-value>Tom &amp; Jerry &lt;live&gt;</param-value>"));
    assert!(xml.contains("<listener-class>org.jruby.rack.RackServletContextListener</listener-class>"));
    assert!(xml.contains("<res-ref-name>jdbc/main</res-ref-name>"));
    assert!(xml.contains("<res-ref-name>jdbc/audit</res-ref-name>"));
    assert!(!xml.contains("<param-name>booter</param-name>"));
    assert!(xml.ends_with("</web-app>\n"));
  }

  #[test]
  fn template_references_are_expanded() {
    let config = config_with(json!({ "rails": { "env": "staging" }, "booter": "rails" }));
    let out = expand_template(
      "<env><%= webxml.rails.env %></env><l><%=webxml.servlet_context_listener%></l><m><%= webxml.nope %></m>",
      &config,
    );
    assert_eq!(
      out,
      "<env>staging</env><l>org.jruby.rack.rails.RailsServletContextListener</l><m>No value for 'nope' found</m>"
    );
  }

  #[test]
  #[tracing_test::traced_test]
  fn unsupported_erb_is_reported() {
    let out = expand_template("<% if x %>y<% end %>", &Config::default());
    assert_eq!(out, "<% if x %>y<% end %>");
    assert!(logs_contain("ERB code that is not expanded"));
  }
}
