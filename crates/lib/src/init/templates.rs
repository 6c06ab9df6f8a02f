//! Template content for `warble config`.

/// Starting point for `config/warble.lua`.
pub const WARBLE_LUA_TEMPLATE: &str = r#"-- Warbler configuration.
--
-- This function runs once with the configuration after the detected traits
-- have set their defaults. Modify the table in place, or return a new one.
--
-- `warble.dir` is the project root, `warble.traits` the detected traits.
-- `warble.glob(pattern)` lists project files; `warble.path` has join,
-- basename, dirname and exists helpers.

---@param config warble.Config
return function(config)
  -- Application directories copied into the archive.
  -- config.dirs = { "app", "config", "lib", "log", "vendor", "tmp" }

  -- Extra files and exclusions: globs, or { regex = "..." }.
  -- table.insert(config.includes, "Rakefile")
  -- table.insert(config.excludes, "lib/tasks/**/*")

  -- Keep log files.
  -- config.exclude_logs = false

  -- Additional gems, with an optional version requirement.
  -- table.insert(config.gems, "jruby-openssl")
  -- table.insert(config.gems, { name = "rack", version = "~> 2.2" })

  -- Package only the listed gems, without their dependencies.
  -- config.gem_dependencies = false

  -- Gem files to leave out, as regular expressions.
  -- config.gem_excludes = { "^(test|spec)/" }

  -- Bundler groups to skip.
  -- config.bundle_without = { "development", "test" }

  -- Features: "compiled", "gemjar", "executable".
  -- table.insert(config.features, "gemjar")

  -- Archive name (without extension) and output directory.
  -- config.jar_name = "app"
  -- config.autodeploy_dir = "dist"

  -- Context parameters for the generated web.xml.
  -- config.webxml.rails = { env = "production" }
  -- config.webxml.jruby = { min = { runtimes = 1 }, max = { runtimes = 4 } }

  -- Script run by `java -jar`, and its arguments.
  -- config.executable = "bin/app"
  -- config.executable_params = "--verbose"
end
"#;

/// LuaLS type definitions for the configuration table and the `warble`
/// global.
pub const WARBLE_D_LUA: &str = r#"---@meta

---@class warble.Gem
---@field name string
---@field version? string

---@class warble.Pattern
---@field regex string

---@class warble.Config
---@field dirs string[]
---@field includes (string|warble.Pattern)[]
---@field excludes (string|warble.Pattern)[]
---@field exclude_logs boolean
---@field java_libs string[]
---@field java_classes string[]
---@field public_html string[]
---@field webinf_files string[]
---@field script_files string[]
---@field gems (string|warble.Gem)[]
---@field gem_dependencies boolean
---@field gem_excludes string[]
---@field gem_path string
---@field gem_paths string[]
---@field pathmaps table<string, string[]>
---@field features ("compiled"|"gemjar"|"executable")[]
---@field jar_name string
---@field jar_extension string
---@field autodeploy_dir? string
---@field webxml table<string, any>
---@field init_filename string
---@field init_contents table[]
---@field override_gem_home boolean
---@field load_paths string[]
---@field manifest_file? string
---@field compiled_ruby_files string[]
---@field compile_gems boolean
---@field bytecode_version? string
---@field jrubyc_options string[]
---@field executable? string
---@field executable_params? string
---@field bundler boolean
---@field bundle_without string[]
---@field jbundler boolean
---@field support_jar? string
---@field webserver_jar? string

---@class warble.Path
---@field join fun(...: string): string
---@field basename fun(path: string): string
---@field dirname fun(path: string): string
---@field exists fun(path: string): boolean

---@class warble.Globals
---@field dir string
---@field version string
---@field traits string[]
---@field glob fun(pattern: string): string[]
---@field path warble.Path

---@type warble.Globals
warble = {}
"#;

/// Template for `.luarc.json`; `{types_path}` is substituted.
pub const LUARC_JSON_TEMPLATE: &str = r#"{
  "$schema": "https://raw.githubusercontent.com/LuaLS/vscode-lua/master/setting/schema.json",
  "runtime": {
    "version": "Lua 5.4"
  },
  "workspace": {
    "library": [
      "{types_path}"
    ],
    "checkThirdParty": false
  },
  "diagnostics": {
    "globals": ["warble"]
  }
}
"#;
