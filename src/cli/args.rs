//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use crate::{CliArgs, MapMode};

/// stackforge - multi-component project scaffolding
#[derive(Parser, Debug)]
#[command(name = "stackforge")]
#[command(about = "Generate multi-component projects with platform tools and embedded fallbacks")]
#[command(long_about = r#"
stackforge generates a project made of several components (a Next.js frontend,
a Go backend, Android and iOS apps) in one run. Each component is produced by
its platform's own tool when that tool is installed, and from embedded
templates otherwise.

EXAMPLES:
  # Generate every component listed in .stackforge/config.toml
  stackforge generate

  # See what would happen without touching anything
  stackforge preview

  # Generate from embedded templates only, one component at a time
  stackforge generate --no-external-tools --sequential

  # Check which tools are installed
  stackforge doctor

  # Share probed tool results with another machine
  stackforge cache export tools.json

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .stackforge/config.toml
  Use --config to specify an explicit config file path
  STACKFORGE_HOME overrides where the tool cache and backups live
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Enable verbose output (streams external tool output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project name (default output directory is ./<project-name>)
    #[arg(long, global = true)]
    pub project_name: Option<String>,

    /// Directory the project is generated into
    #[arg(long, short = 'o', global = true)]
    pub output_dir: Option<Utf8PathBuf>,

    /// Never run external tools; use embedded templates for every component
    #[arg(long, global = true)]
    pub no_external_tools: bool,

    /// Force offline mode (implies embedded templates)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Probe the network before generating and go offline if unreachable
    #[arg(long, global = true)]
    pub detect_offline: bool,

    /// Generate one component at a time and stop at the first failure
    #[arg(long, global = true)]
    pub sequential: bool,

    /// Maximum concurrent components (1-4)
    #[arg(long, global = true)]
    pub max_workers: Option<usize>,

    /// Timeout for each external tool invocation, in seconds
    #[arg(long, global = true)]
    pub tool_timeout: Option<u64>,

    /// Do not back up an existing output directory
    #[arg(long, global = true)]
    pub no_backup: bool,

    /// Keep the backup after a successful run
    #[arg(long, global = true)]
    pub keep_backup: bool,

    /// How generated components are placed: move, copy or symlink
    #[arg(long, global = true)]
    pub map_mode: Option<MapMode>,

    /// Tool cache TTL in seconds (max 86400)
    #[arg(long, global = true)]
    pub cache_ttl: Option<u64>,

    /// Tool cache file (default: $STACKFORGE_HOME/cache/tools.json)
    #[arg(long, global = true)]
    pub cache_path: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Overrides for the configuration system.
    #[must_use]
    pub fn to_cli_args(&self) -> CliArgs {
        CliArgs {
            config_path: self.config.clone(),
            project_name: self.project_name.clone(),
            output_dir: self.output_dir.clone(),
            no_external_tools: self.no_external_tools,
            offline: self.offline,
            detect_offline: self.detect_offline,
            sequential: self.sequential,
            max_workers: self.max_workers,
            tool_timeout_secs: self.tool_timeout,
            no_backup: self.no_backup,
            keep_backup: self.keep_backup,
            map_mode: self.map_mode,
            verbose: self.verbose.then_some(true),
            cache_ttl_secs: self.cache_ttl,
            cache_path: self.cache_path.clone(),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate every enabled component
    ///
    /// Probes required tools (through the cache), backs up an existing output
    /// directory, generates components in parallel, relocates them into the
    /// project layout and rolls everything back if any component fails.
    ///
    /// EXAMPLES:
    ///   stackforge generate
    ///   stackforge generate --output-dir ./acme --keep-backup
    ///   stackforge generate --json
    Generate {
        /// Output the generation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the strategy each component would use, without generating
    ///
    /// Uses only what the tool cache already knows; nothing is probed,
    /// executed or written.
    ///
    /// EXAMPLES:
    ///   stackforge preview
    ///   stackforge preview --no-external-tools --json
    Preview {
        /// Output the preview as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run environment health checks
    ///
    /// EXAMPLES:
    ///   stackforge doctor
    ///   stackforge doctor --json
    Doctor {
        /// Output doctor results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and manage the tool availability cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Tool cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show entry counts and TTL
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check every entry for clock skew and out-of-range TTLs
    Validate {
        /// Drop invalid entries and save
        #[arg(long)]
        repair: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the cache to a portable file (format version 1.0)
    Export {
        /// Destination file
        path: Utf8PathBuf,
    },

    /// Load entries from an exported file; a rejected file leaves the cache unchanged
    Import {
        /// Exported file
        path: Utf8PathBuf,
    },

    /// Re-probe tools regardless of TTL
    ///
    /// EXAMPLES:
    ///   stackforge cache refresh
    ///   stackforge cache refresh go npx
    Refresh {
        /// Tools to re-probe (default: every cached tool, or every known tool
        /// when the cache is empty)
        tools: Vec<String>,
    },

    /// Remove every entry
    Clear,
}

impl Commands {
    /// Short name used in error reports.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Preview { .. } => "preview",
            Self::Doctor { .. } => "doctor",
            Self::Cache(_) => "cache",
        }
    }
}

/// Build the clap command (for completions and help tests).
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
