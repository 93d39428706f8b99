//! Timer primitive: the schedule-driven ticking engine jobs are built on.
//!
//! The registry only talks to timers through [`Timer`] and [`TimerFactory`],
//! so the production [`CronTimer`] can be swapped for a [`ManualTimer`] in
//! tests.

mod cron;
mod manual;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use croner::Cron;
use serde::{Deserialize, Serialize};

use crate::SchedulerError;

pub use cron::{CronTimer, CronTimerFactory};
pub use manual::{ManualTimer, ManualTimerFactory, TimerEvent};

/// Callback fired by a timer, already bound to whatever context it needs.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// A started/stopped ticking primitive.
///
/// `start` and `stop` must be idempotent: starting a running timer or
/// stopping a stopped one is a no-op.
pub trait Timer: Send + Sync {
    /// Begin firing ticks according to the schedule.
    fn start(&self);

    /// Stop firing ticks.
    fn stop(&self);

    /// Whether the timer is currently active.
    fn is_running(&self) -> bool;

    /// The next time this timer would fire, if any.
    fn next_tick(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// The scheduled time of the most recent tick, if any.
    fn last_tick(&self) -> Option<DateTime<Utc>> {
        None
    }
}

impl<T: Timer + ?Sized> Timer for Arc<T> {
    fn start(&self) {
        (**self).start()
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn next_tick(&self) -> Option<DateTime<Utc>> {
        (**self).next_tick()
    }

    fn last_tick(&self) -> Option<DateTime<Utc>> {
        (**self).last_tick()
    }
}

/// Builds timers from a schedule expression and bound callbacks.
pub trait TimerFactory: Send + Sync {
    /// Create a stopped timer.
    ///
    /// `on_complete` is `None` when the job has no completion callback; a
    /// factory must not substitute an empty closure for it.
    ///
    /// # Errors
    ///
    /// Returns a schedule error (`InvalidCron`, `InvalidTimezone`,
    /// `InvalidBounds`) when the expression or options are unusable.
    fn create(
        &self,
        schedule: &str,
        options: &ScheduleOptions,
        on_tick: TimerCallback,
        on_complete: Option<TimerCallback>,
    ) -> Result<Box<dyn Timer>, SchedulerError>;
}

/// Scheduling options handed through to the timer untouched by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// IANA timezone the expression is evaluated in.
    #[serde(default)]
    pub timezone: Option<String>,

    /// Evaluate in UTC regardless of `timezone`.
    #[serde(default)]
    pub utc: bool,

    /// No tick fires before this instant.
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,

    /// No tick fires after this instant; the schedule completes once it passes.
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl ScheduleOptions {
    /// Evaluate the schedule in the given timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Force UTC evaluation.
    pub fn utc(mut self) -> Self {
        self.utc = true;
        self
    }

    /// Hold ticks back until `at`.
    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }

    /// End the schedule at `at`.
    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.until = Some(at);
        self
    }

    /// Check that the bounds leave room for at least one tick.
    pub fn validate_bounds(&self) -> Result<(), SchedulerError> {
        if let (Some(start), Some(end)) = (self.not_before, self.until) {
            if end < start {
                return Err(SchedulerError::InvalidBounds(format!(
                    "until ({}) is before not_before ({})",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

/// Parse a cron expression. Accepts 5-field and 6-field (with seconds) forms.
pub(crate) fn parse_cron(expr: &str) -> Result<Cron, SchedulerError> {
    Cron::new(expr)
        .with_seconds_optional()
        .parse()
        .map_err(|e| SchedulerError::InvalidCron(format!("'{}': {}", expr, e)))
}

/// Validate a cron expression.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidCron` if the expression is not valid.
///
/// # Example
///
/// ```
/// use hostcron_scheduler::validate_cron_expression;
///
/// assert!(validate_cron_expression("* * * * *").is_ok());   // Every minute
/// assert!(validate_cron_expression("0 30 4 * * *").is_ok()); // 4:30 AM daily
///
/// assert!(validate_cron_expression("invalid").is_err());
/// assert!(validate_cron_expression("").is_err());
/// ```
pub fn validate_cron_expression(expr: &str) -> Result<(), SchedulerError> {
    parse_cron(expr).map(|_| ())
}
