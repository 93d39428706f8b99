//! Wiring a job registry into a host's lifecycle.

use std::sync::Arc;

use tracing::info;

use crate::host::Host;
use crate::registry::{JobRegistry, JobSpec};
use crate::timer::TimerFactory;
use crate::SchedulerError;

/// Name the registry is exposed under on the host.
pub const DECORATOR_NAME: &str = "cron";

/// Jobs to create at registration time.
///
/// `None` entries are disabled placeholders and are skipped.
pub struct CronOptions<H> {
    /// Initial jobs, created in order.
    pub jobs: Vec<Option<JobSpec<H>>>,
}

impl<H> Default for CronOptions<H> {
    fn default() -> Self {
        Self { jobs: Vec::new() }
    }
}

impl<H> CronOptions<H> {
    /// Options with the given initial jobs.
    pub fn with_jobs(jobs: Vec<Option<JobSpec<H>>>) -> Self {
        Self { jobs }
    }
}

/// Attach a job registry to `host`.
///
/// Seeds the registry from `options.jobs` in order, exposes it under
/// [`DECORATOR_NAME`] and stops every job when the host closes.
///
/// # Errors
///
/// The first failing job aborts registration and its error is returned;
/// the host is left undecorated. Fails with
/// `SchedulerError::AlreadyDecorated` if the host already carries a
/// registry.
pub fn register<H: Host>(
    host: &Arc<H>,
    options: CronOptions<H>,
    timers: Arc<dyn TimerFactory>,
) -> Result<Arc<JobRegistry<H>>, SchedulerError> {
    if host.decoration(DECORATOR_NAME).is_some() {
        return Err(SchedulerError::AlreadyDecorated(DECORATOR_NAME.to_string()));
    }
    let registry = Arc::new(JobRegistry::new(host, timers));

    // Ready hooks are queued only once the host carries the registry.
    let mut skipped = 0usize;
    let mut deferred = Vec::new();
    for spec in options.jobs {
        match spec {
            Some(spec) => {
                let start_when_ready = spec.start_when_ready;
                let job = registry.append(spec)?;
                if start_when_ready {
                    deferred.push(job);
                }
            }
            None => skipped += 1,
        }
    }

    host.decorate(DECORATOR_NAME, registry.clone())?;

    let closing = registry.clone();
    host.on_close(Box::new(move || closing.stop_all_jobs()));

    for job in &deferred {
        registry.start_when_ready(job);
    }

    info!(jobs = registry.len(), skipped, "Cron registry attached");
    Ok(registry)
}

/// The registry previously attached to `host` by [`register`].
pub fn cron<H: Host>(host: &H) -> Option<Arc<JobRegistry<H>>> {
    host.decoration(DECORATOR_NAME)?
        .downcast::<JobRegistry<H>>()
        .ok()
}
