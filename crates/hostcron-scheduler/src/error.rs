//! Error types for the scheduler crate.
//!
//! Covers schedule validation, timezone parsing, runtime discovery and
//! host decoration.

use thiserror::Error;

/// Errors that can occur during scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid cron expression
    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),

    /// Invalid timezone string
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Schedule bounds that can never produce a tick
    #[error("Invalid schedule bounds: {0}")]
    InvalidBounds(String),

    /// No tokio runtime to drive timers on
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// The host already carries a capability under this name
    #[error("Host already decorated with '{0}'")]
    AlreadyDecorated(String),
}

impl SchedulerError {
    /// Whether this error comes from a job's schedule configuration.
    ///
    /// These are the errors `JobRegistry::create_job` surfaces for a bad
    /// schedule expression, timezone or bound.
    pub fn is_schedule_error(&self) -> bool {
        matches!(
            self,
            SchedulerError::InvalidCron(_)
                | SchedulerError::InvalidTimezone(_)
                | SchedulerError::InvalidBounds(_)
        )
    }
}
