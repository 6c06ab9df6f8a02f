//! Group membership of gems declared in a `Gemfile`.
//!
//! Only `gem` lines and `group ... do` blocks are understood; everything
//! else in the file is skipped. Gems outside any group belong to `default`.

use std::collections::HashMap;

pub const DEFAULT_GROUP: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GemfileGroups {
  groups: HashMap<String, Vec<String>>,
}

enum Block {
  Group(Vec<String>),
  Other,
}

impl GemfileGroups {
  pub fn parse(source: &str) -> Self {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    let mut stack: Vec<Block> = Vec::new();

    for raw in source.lines() {
      let line = strip_comment(raw).trim();
      if line.is_empty() {
        continue;
      }

      if line == "end" {
        stack.pop();
        continue;
      }

      let opens_block = line.ends_with(" do") || line.contains(" do |");

      if let Some(args) = keyword_args(line, "group") {
        if opens_block {
          stack.push(Block::Group(symbols(args.trim_end_matches(" do"))));
        }
        continue;
      }

      if let Some(args) = keyword_args(line, "gem") {
        let mut args = args;
        if opens_block {
          args = args.split(" do").next().unwrap_or(args);
          stack.push(Block::Other);
        }
        let Some(name) = first_string(args) else {
          continue;
        };
        let mut member_of: Vec<String> = stack
          .iter()
          .filter_map(|b| match b {
            Block::Group(g) => Some(g.clone()),
            Block::Other => None,
          })
          .flatten()
          .collect();
        member_of.extend(inline_groups(args));
        if member_of.is_empty() {
          member_of.push(DEFAULT_GROUP.to_string());
        }
        let entry = groups.entry(name).or_default();
        for g in member_of {
          if !entry.contains(&g) {
            entry.push(g);
          }
        }
        continue;
      }

      if opens_block {
        stack.push(Block::Other);
      }
    }

    Self { groups }
  }

  /// Groups a gem was declared in; `None` for gems the Gemfile does not name.
  pub fn groups_of(&self, name: &str) -> Option<&[String]> {
    self.groups.get(name).map(Vec::as_slice)
  }
}

fn strip_comment(line: &str) -> &str {
  let mut quote = None;
  for (i, c) in line.char_indices() {
    match (quote, c) {
      (None, '#') => return &line[..i],
      (None, '"' | '\'') => quote = Some(c),
      (Some(q), _) if c == q => quote = None,
      _ => {}
    }
  }
  line
}

/// The arguments of a `keyword arg, ...` or `keyword(arg, ...)` call.
fn keyword_args<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
  let rest = line.strip_prefix(keyword)?;
  if rest.starts_with(' ') || rest.starts_with('(') {
    Some(rest.trim_start_matches('(').trim())
  } else {
    None
  }
}

fn first_string(args: &str) -> Option<String> {
  let start = args.find(['"', '\''])?;
  let quote = args[start..].chars().next()?;
  let rest = &args[start + 1..];
  let end = rest.find(quote)?;
  Some(rest[..end].to_string())
}

/// Symbols or strings in a group list such as `:development, :test`.
fn symbols(list: &str) -> Vec<String> {
  list
    .split(|c: char| c == ',' || c == '[' || c == ']' || c.is_whitespace())
    .map(|s| s.trim().trim_start_matches(':').trim_matches(['"', '\'', ')']))
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

/// Groups given with `group:`, `groups:` or `:group =>` on a gem line.
fn inline_groups(args: &str) -> Vec<String> {
  for key in ["groups:", "group:", ":groups =>", ":group =>"] {
    if let Some(idx) = args.find(key) {
      let value = &args[idx + key.len()..];
      let value = value.trim_start();
      let value = if value.starts_with('[') {
        value.split(']').next().unwrap_or(value)
      } else {
        value.split(',').next().unwrap_or(value)
      };
      return symbols(value);
    }
  }
  Vec::new()
}
