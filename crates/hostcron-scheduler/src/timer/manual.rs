//! Manually driven timer for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono_tz::Tz;

use super::{parse_cron, ScheduleOptions, Timer, TimerCallback, TimerFactory};
use crate::config::zone_for;
use crate::SchedulerError;

/// Start or stop call seen by a [`ManualTimerFactory`], tagged with the
/// timer's creation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// `start` was called on the timer.
    Started(usize),
    /// `stop` was called on the timer.
    Stopped(usize),
}

type EventLog = Arc<Mutex<Vec<TimerEvent>>>;

/// Timer that never fires on its own.
///
/// Tests drive it with [`ManualTimer::fire`] and [`ManualTimer::complete`].
/// Like a real timer, a fire is ignored unless the timer is running, and
/// stopping a running timer fires the completion callback.
pub struct ManualTimer {
    index: usize,
    events: EventLog,
    schedule: String,
    options: ScheduleOptions,
    running: AtomicBool,
    starts: AtomicU32,
    stops: AtomicU32,
    on_tick: TimerCallback,
    on_complete: Option<TimerCallback>,
}

impl ManualTimer {
    /// Fire one tick. Returns whether the tick callback ran.
    pub fn fire(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        (self.on_tick)();
        true
    }

    /// Exhaust the schedule: stop and fire the completion callback if any.
    pub fn complete(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(callback) = &self.on_complete {
            callback();
        }
    }

    /// Whether a completion callback was handed to the factory.
    pub fn has_complete_callback(&self) -> bool {
        self.on_complete.is_some()
    }

    /// Position of this timer in its factory's creation order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Schedule expression the timer was created with.
    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Options the timer was created with.
    pub fn options(&self) -> &ScheduleOptions {
        &self.options
    }

    /// Number of `start` calls, including no-op ones.
    pub fn start_calls(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls, including no-op ones.
    pub fn stop_calls(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ManualTimer {
    fn record(&self, event: TimerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Timer for ManualTimer {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.record(TimerEvent::Started(self.index));
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.record(TimerEvent::Stopped(self.index));
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some(callback) = &self.on_complete {
                callback();
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Factory recording every [`ManualTimer`] it creates, in creation order.
///
/// Expressions are validated with the same parser the cron timer uses, so
/// bad schedules fail here too.
#[derive(Default)]
pub struct ManualTimerFactory {
    timers: Mutex<Vec<Arc<ManualTimer>>>,
    events: EventLog,
}

impl ManualTimerFactory {
    /// Create a new factory with no timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// All timers created so far.
    pub fn timers(&self) -> Vec<Arc<ManualTimer>> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every start and stop call across all timers, in call order.
    pub fn events(&self) -> Vec<TimerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Timer created at position `index`.
    pub fn timer(&self, index: usize) -> Option<Arc<ManualTimer>> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }
}

impl TimerFactory for ManualTimerFactory {
    fn create(
        &self,
        schedule: &str,
        options: &ScheduleOptions,
        on_tick: TimerCallback,
        on_complete: Option<TimerCallback>,
    ) -> Result<Box<dyn Timer>, SchedulerError> {
        parse_cron(schedule)?;
        zone_for(options, Tz::UTC)?;
        options.validate_bounds()?;

        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        let timer = Arc::new(ManualTimer {
            index: timers.len(),
            events: self.events.clone(),
            schedule: schedule.to_string(),
            options: options.clone(),
            running: AtomicBool::new(false),
            starts: AtomicU32::new(0),
            stops: AtomicU32::new(0),
            on_tick,
            on_complete,
        });
        timers.push(timer.clone());
        Ok(Box::new(timer))
    }
}
