/// Name used in manifests, log messages and the Lua global table.
pub const APP_NAME: &str = "warbler";

/// Version stamped into `Created-By` manifest headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project-relative location of the configuration file.
pub const CONFIG_FILE: &str = "config/warble.lua";

/// Environment variable pointing at the tool's installation directory.
pub const HOME_ENV: &str = "WARBLER_HOME";

/// Top-level directories copied into the archive by default.
pub const TOP_DIRS: &[&str] = &["app", "config", "lib", "log", "vendor", "tmp"];

/// Path of the archive metadata file.
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Path of the generated bootstrap script.
pub const INIT_FILENAME: &str = "META-INF/init.rb";
