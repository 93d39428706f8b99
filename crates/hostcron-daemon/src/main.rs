//! Cron Daemon
//!
//! Runs cron jobs declared in a config file for the lifetime of the process.
//!
//! # Usage
//!
//! ```bash
//! hostcron start [--host-name NAME]
//! hostcron stop
//! hostcron status
//! hostcron check
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/hostcron/config.toml, or `--config`)
//! 3. Environment variables (HOSTCRON_*)
//! 4. CLI flags

use anyhow::Result;

use hostcron_daemon::{check_config, show_status, start_daemon, stop_daemon, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start { host_name } => {
            start_daemon(
                cli.config.as_deref(),
                host_name.as_deref(),
                cli.log_level.as_deref(),
            )
            .await?;
        }
        Commands::Stop => {
            stop_daemon(cli.config.as_deref())?;
        }
        Commands::Status => {
            show_status(cli.config.as_deref())?;
        }
        Commands::Check => {
            check_config(cli.config.as_deref())?;
        }
    }

    Ok(())
}
