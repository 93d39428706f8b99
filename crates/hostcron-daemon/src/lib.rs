//! Cron daemon library exports.
//!
//! This crate provides the `hostcron` binary, which runs the jobs declared
//! in a config file against a long-lived host until interrupted.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, stop, status, check)
//! - `jobs`: Mapping config entries to job specs
//! - `pidfile`: Locating the running daemon
//! - `settings`: Layered configuration

pub mod cli;
pub mod commands;
pub mod error;
pub mod jobs;
pub mod pidfile;
pub mod settings;

pub use cli::{Cli, Commands};
pub use commands::{check_config, check_jobs, show_status, start_daemon, stop_daemon, JobReport};
pub use error::DaemonError;
pub use jobs::{build_spec, build_specs, run_action};
pub use pidfile::{PidFile, PidState};
pub use settings::{JobAction, JobEntry, Settings};
