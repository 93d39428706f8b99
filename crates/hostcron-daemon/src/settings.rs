//! Configuration loading for the cron daemon.
//!
//! Layered config: defaults -> default config file -> `--config` file ->
//! `HOSTCRON_*` environment variables -> CLI flags.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use hostcron_scheduler::{ScheduleOptions, SchedulerConfig};

use crate::error::DaemonError;

/// What a job does when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobAction {
    /// Write a message to the log.
    Log {
        /// Message to log
        message: String,
    },
    /// Run an external program.
    Command {
        /// Program to execute
        program: String,
        /// Arguments passed to the program
        #[serde(default)]
        args: Vec<String>,
    },
}

/// One job as declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEntry {
    /// Lookup name
    #[serde(default)]
    pub name: Option<String>,

    /// Cron expression (5 or 6 fields)
    pub schedule: String,

    /// Disabled entries are kept in the list but never created.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Start once the daemon has finished booting.
    #[serde(default)]
    pub start_when_ready: bool,

    /// Run on every tick
    pub action: JobAction,

    /// Run when the job stops or its schedule runs out
    #[serde(default)]
    pub on_complete: Option<JobAction>,

    /// Timezone and bounds
    #[serde(default)]
    pub options: ScheduleOptions,
}

fn default_enabled() -> bool {
    true
}

/// Daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Host name handed to job callbacks
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// PID file location (defaults to the per-user runtime dir)
    #[serde(default)]
    pub pid_file: Option<PathBuf>,

    /// Timer defaults
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Jobs created at startup, in order
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host_name() -> String {
    "hostcron".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            host_name: default_host_name(),
            pid_file: None,
            scheduler: SchedulerConfig::default(),
            jobs: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from all configured sources.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::Config` if a required file is missing or a
    /// source does not match the settings layout.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, DaemonError> {
        let default_config_path = default_config_dir().join("config");

        let mut builder = Config::builder()
            // 1. Built-in defaults
            .set_default("log_level", default_log_level())
            .map_err(|e| DaemonError::Config(e.to_string()))?
            .set_default("host_name", default_host_name())
            .map_err(|e| DaemonError::Config(e.to_string()))?
            // 2. Default config file (~/.config/hostcron/config.toml)
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        // 3. CLI-specified config file
        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // 4. Environment variables: HOSTCRON_LOG_LEVEL, HOSTCRON_SCHEDULER__DEFAULT_TIMEZONE
        builder = builder.add_source(
            Environment::with_prefix("HOSTCRON")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Number of enabled jobs.
    pub fn enabled_jobs(&self) -> usize {
        self.jobs.iter().filter(|entry| entry.enabled).count()
    }
}

/// Directory holding the default config file.
pub fn default_config_dir() -> PathBuf {
    ProjectDirs::from("", "", "hostcron")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
