//! A named job: one timer plus identity metadata.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::timer::Timer;

/// One scheduled unit of recurring work.
///
/// A job has no state machine of its own; running state belongs to the
/// wrapped timer. Jobs are only created through
/// [`JobRegistry::create_job`](crate::JobRegistry::create_job).
pub struct Job {
    id: Uuid,
    name: Option<String>,
    schedule: String,
    timer: Box<dyn Timer>,
}

impl Job {
    pub(crate) fn new(name: Option<String>, schedule: String, timer: Box<dyn Timer>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            schedule,
            timer,
        }
    }

    /// Unique id assigned at creation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name given at creation. Not unique across jobs.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Cron expression the job was created with.
    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Start ticking. No-op if already running.
    pub fn start(&self) {
        debug!(job = ?self.name, uuid = %self.id, "Starting job");
        self.timer.start();
    }

    /// Stop ticking. No-op if already stopped.
    pub fn stop(&self) {
        debug!(job = ?self.name, uuid = %self.id, "Stopping job");
        self.timer.stop();
    }

    /// Whether the job's timer is active.
    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Next time the job would fire.
    pub fn next_tick(&self) -> Option<DateTime<Utc>> {
        self.timer.next_tick()
    }

    /// Scheduled time of the last tick.
    pub fn last_tick(&self) -> Option<DateTime<Utc>> {
        self.timer.last_tick()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("running", &self.is_running())
            .finish()
    }
}
