mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use warbler_lib::config::Feature;

use crate::cmd::{ArchiveKind, ProjectArgs};
use crate::output::OutputFormat;

/// warble - package Ruby applications as JRuby jar and war files
#[derive(Parser)]
#[command(name = "warble")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Project directory
  #[arg(short = 'C', long = "directory", global = true, default_value = ".")]
  directory: PathBuf,

  /// Configuration file, relative to the project (default: config/warble.lua)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the project archive, expecting a war
  War {
    /// Features to enable for this build
    #[arg(short, long, value_enum)]
    feature: Vec<FeatureArg>,
  },

  /// Build the project archive, expecting a jar
  Jar {
    /// Features to enable for this build
    #[arg(short, long, value_enum)]
    feature: Vec<FeatureArg>,
  },

  /// Remove the archive and compilation output
  Clean,

  /// List the traits detected for the project
  Traits {
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Write a configuration template, or print the resolved configuration
  Config {
    /// Overwrite an existing configuration file
    #[arg(short, long)]
    force: bool,

    /// Print the resolved configuration as JSON instead
    #[arg(long, conflicts_with = "force")]
    print: bool,
  },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FeatureArg {
  Compiled,
  Gemjar,
  Executable,
}

impl From<FeatureArg> for Feature {
  fn from(arg: FeatureArg) -> Self {
    match arg {
      FeatureArg::Compiled => Feature::Compiled,
      FeatureArg::Gemjar => Feature::Gemjar,
      FeatureArg::Executable => Feature::Executable,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let project = ProjectArgs {
    dir: cli.directory,
    config: cli.config,
  };

  match cli.command {
    Commands::War { feature } => cmd::cmd_build(&project, ArchiveKind::War, &features(&feature)),
    Commands::Jar { feature } => cmd::cmd_build(&project, ArchiveKind::Jar, &features(&feature)),
    Commands::Clean => cmd::cmd_clean(&project),
    Commands::Traits { output } => cmd::cmd_traits(&project, output),
    Commands::Config { force, print } => {
      if print {
        cmd::cmd_config_print(&project)
      } else {
        cmd::cmd_config_init(&project, force)
      }
    }
  }
}

fn features(args: &[FeatureArg]) -> Vec<Feature> {
  args.iter().map(|&f| f.into()).collect()
}
