//! Error types for the daemon.

use thiserror::Error;

/// Errors raised while preparing the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scheduler error
    #[error(transparent)]
    Scheduler(#[from] hostcron_scheduler::SchedulerError),
}
