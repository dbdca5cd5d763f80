//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Top-level CLI entry point for the file-sharing host engine.
#[derive(Parser, Debug)]
#[command(
    name = "sharehost",
    about = "Provision and supervise a multi-protocol file-sharing host",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Console log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Configuration file (JSON, or TOML by extension); falls back to the
    /// JSON document in the CONFIG environment variable
    #[arg(short, long, global = true, env = "SHAREHOST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prefix for every rendered artifact and home directory
    #[arg(long, global = true, default_value = "/")]
    pub root: PathBuf,

    /// Host name announced by the daemons
    #[arg(long, global = true, env = "HOSTNAME")]
    pub hostname: Option<String>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Provision the host, then supervise its daemons until they exit
    Run,
    /// Print the provisioning plan without applying it
    Plan,
    /// Validate the configuration and report warnings
    Check,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the persistent log file.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Plan => "plan",
            Self::Check => "check",
            Self::Version => "version",
        }
    }
}
