//! CLI argument parsing for the cron daemon.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Cron daemon
///
/// Runs the jobs declared in the configuration file until interrupted.
#[derive(Parser, Debug)]
#[command(name = "hostcron")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/hostcron/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the daemon in the foreground
    Start {
        /// Override the host name passed to job callbacks
        #[arg(long)]
        host_name: Option<String>,
    },

    /// Stop the running daemon
    Stop,

    /// Show daemon status
    Status,

    /// Validate configured jobs and show when they fire next
    Check,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
