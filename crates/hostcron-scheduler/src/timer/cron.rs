//! Cron timer driven by a tokio task.
//!
//! Each running period of a [`CronTimer`] owns one spawned task that sleeps
//! until the next occurrence, fires the tick callback and loops. Stopping
//! cancels the task through a [`CancellationToken`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use croner::Cron;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::{parse_cron, ScheduleOptions, Timer, TimerCallback, TimerFactory};
use crate::config::zone_for;
use crate::{SchedulerConfig, SchedulerError};

/// Builds [`CronTimer`]s that run on a tokio runtime.
pub struct CronTimerFactory {
    config: SchedulerConfig,
    default_timezone: Tz,
    runtime: Handle,
}

impl CronTimerFactory {
    /// Create a factory spawning timers onto `runtime`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTimezone` if the configured default
    /// timezone is not a valid IANA name.
    pub fn new(config: SchedulerConfig, runtime: Handle) -> Result<Self, SchedulerError> {
        let default_timezone = config.parse_timezone()?;
        Ok(Self {
            config,
            default_timezone,
            runtime,
        })
    }

    /// Create a factory bound to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NoRuntime` when called outside a tokio runtime.
    pub fn from_current(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let runtime = Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;
        Self::new(config, runtime)
    }

    /// Get the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl TimerFactory for CronTimerFactory {
    fn create(
        &self,
        schedule: &str,
        options: &ScheduleOptions,
        on_tick: TimerCallback,
        on_complete: Option<TimerCallback>,
    ) -> Result<Box<dyn Timer>, SchedulerError> {
        let cron = parse_cron(schedule)?;
        let timezone = zone_for(options, self.default_timezone)?;
        options.validate_bounds()?;

        let plan = Plan {
            cron,
            timezone,
            not_before: options.not_before,
            until: options.until,
        };
        Ok(Box::new(CronTimer {
            shared: Arc::new(Shared {
                plan,
                on_tick,
                on_complete,
                state: Mutex::new(TimerState::default()),
            }),
            runtime: self.runtime.clone(),
        }))
    }
}

/// Parsed schedule plus its evaluation bounds.
struct Plan {
    cron: Cron,
    timezone: Tz,
    not_before: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

impl Plan {
    /// First occurrence strictly after `after`, respecting both bounds.
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let (from, inclusive) = match self.not_before {
            Some(start) if start > after => (start, true),
            _ => (after, false),
        };
        let next = self
            .cron
            .find_next_occurrence(&from.with_timezone(&self.timezone), inclusive)
            .ok()?
            .with_timezone(&Utc);
        match self.until {
            Some(end) if next > end => None,
            _ => Some(next),
        }
    }
}

#[derive(Default)]
struct TimerState {
    /// Bumped on every start so a stale task cannot finish a newer run.
    generation: u64,
    active: Option<CancellationToken>,
    last_tick: Option<DateTime<Utc>>,
}

struct Shared {
    plan: Plan,
    on_tick: TimerCallback,
    on_complete: Option<TimerCallback>,
    state: Mutex<TimerState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self) {
        if let Some(callback) = &self.on_complete {
            invoke("complete", callback);
        }
    }

    /// Mark the run identified by `generation` as exhausted.
    fn finish(&self, generation: u64) {
        let finished = {
            let mut state = self.state();
            if state.generation == generation && state.active.is_some() {
                state.active = None;
                true
            } else {
                false
            }
        };
        if finished {
            debug!("Schedule exhausted");
            self.complete();
        }
    }
}

fn invoke(kind: &'static str, callback: &TimerCallback) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
        error!(callback = kind, "Timer callback panicked");
    }
}

async fn run(shared: Arc<Shared>, generation: u64, token: CancellationToken) {
    let mut cursor = Utc::now();
    loop {
        let Some(next) = shared.plan.next_after(cursor) else {
            shared.finish(generation);
            return;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }
        // stop() may have landed while we were waking up
        if token.is_cancelled() {
            return;
        }

        shared.state().last_tick = Some(next);
        invoke("tick", &shared.on_tick);

        // Occurrences missed while the tick ran are skipped, not replayed.
        cursor = next.max(Utc::now());
    }
}

/// Cron-expression timer.
///
/// Stopping a running timer fires the completion callback, as does the
/// schedule running past its `until` bound.
pub struct CronTimer {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl Timer for CronTimer {
    fn start(&self) {
        let mut state = self.shared.state();
        if state.active.is_some() {
            return;
        }
        state.generation += 1;
        let generation = state.generation;
        let token = CancellationToken::new();
        state.active = Some(token.clone());
        drop(state);

        self.runtime.spawn(run(self.shared.clone(), generation, token));
    }

    fn stop(&self) {
        let token = self.shared.state().active.take();
        if let Some(token) = token {
            token.cancel();
            self.shared.complete();
        }
    }

    fn is_running(&self) -> bool {
        self.shared.state().active.is_some()
    }

    fn next_tick(&self) -> Option<DateTime<Utc>> {
        self.shared.plan.next_after(Utc::now())
    }

    fn last_tick(&self) -> Option<DateTime<Utc>> {
        self.shared.state().last_tick
    }
}

impl Drop for CronTimer {
    fn drop(&mut self) {
        if let Some(token) = self.shared.state().active.take() {
            token.cancel();
        }
    }
}
