//! Job registry: creation, lookup and bulk start/stop of jobs.
//!
//! The registry is append-only. Jobs are kept in creation order, which is
//! also the order bulk operations visit them in. Names are not keys:
//! several jobs may share one and lookup returns the first.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, Weak};

use tracing::info;

use crate::host::Host;
use crate::job::Job;
use crate::timer::{ScheduleOptions, TimerCallback, TimerFactory};
use crate::SchedulerError;

/// Job callback receiving the host as context.
pub type JobCallback<H> = Arc<dyn Fn(&H) + Send + Sync>;

/// Everything needed to create a job.
pub struct JobSpec<H> {
    /// Cron expression, 5 or 6 fields.
    pub schedule: String,
    /// Called on every fire with the host.
    pub on_tick: JobCallback<H>,
    /// Called with the host when the timer completes.
    pub on_complete: Option<JobCallback<H>>,
    /// Start automatically once the host is ready.
    pub start_when_ready: bool,
    /// Lookup name.
    pub name: Option<String>,
    /// Passed to the timer untouched.
    pub options: ScheduleOptions,
}

impl<H> JobSpec<H> {
    /// Create a spec with defaults: unnamed, no completion callback, not
    /// started when the host becomes ready.
    pub fn new(schedule: impl Into<String>, on_tick: impl Fn(&H) + Send + Sync + 'static) -> Self {
        Self {
            schedule: schedule.into(),
            on_tick: Arc::new(on_tick),
            on_complete: None,
            start_when_ready: false,
            name: None,
            options: ScheduleOptions::default(),
        }
    }

    /// Set the lookup name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Start the job once the host is ready.
    pub fn start_when_ready(mut self) -> Self {
        self.start_when_ready = true;
        self
    }

    /// Set the completion callback.
    pub fn on_complete(mut self, on_complete: impl Fn(&H) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(on_complete));
        self
    }

    /// Set timer options.
    pub fn with_options(mut self, options: ScheduleOptions) -> Self {
        self.options = options;
        self
    }
}

impl<H> Clone for JobSpec<H> {
    fn clone(&self) -> Self {
        Self {
            schedule: self.schedule.clone(),
            on_tick: self.on_tick.clone(),
            on_complete: self.on_complete.clone(),
            start_when_ready: self.start_when_ready,
            name: self.name.clone(),
            options: self.options.clone(),
        }
    }
}

impl<H> fmt::Debug for JobSpec<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("schedule", &self.schedule)
            .field("name", &self.name)
            .field("start_when_ready", &self.start_when_ready)
            .field("has_on_complete", &self.on_complete.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// Ordered, append-only collection of jobs bound to one host.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use hostcron_scheduler::{JobRegistry, JobSpec, ManualTimerFactory, ServerHost};
///
/// let host = Arc::new(ServerHost::new("api"));
/// let registry = JobRegistry::new(&host, Arc::new(ManualTimerFactory::new()));
///
/// registry
///     .create_job(JobSpec::new("*/5 * * * *", |host: &ServerHost| {
///         println!("tick on {}", host.name());
///     }).with_name("poll"))
///     .unwrap();
///
/// let job = registry.get_job_by_name("poll").unwrap();
/// assert!(!job.is_running());
/// ```
pub struct JobRegistry<H: Host> {
    host: Weak<H>,
    timers: Arc<dyn TimerFactory>,
    jobs: RwLock<Vec<Arc<Job>>>,
}

impl<H: Host> JobRegistry<H> {
    /// Create an empty registry for `host`.
    ///
    /// The registry holds the host weakly; callbacks firing after the host
    /// is dropped are skipped.
    pub fn new(host: &Arc<H>, timers: Arc<dyn TimerFactory>) -> Self {
        Self {
            host: Arc::downgrade(host),
            timers,
            jobs: RwLock::new(Vec::new()),
        }
    }

    /// Create a job and append it to the registry.
    ///
    /// The job is not started. With `start_when_ready` set, a start is
    /// scheduled through the host's ready hook, which runs immediately if
    /// the host is already ready.
    ///
    /// # Errors
    ///
    /// Returns the timer's schedule error if the expression or options are
    /// invalid. Nothing is appended in that case.
    pub fn create_job(&self, spec: JobSpec<H>) -> Result<Arc<Job>, SchedulerError> {
        let start_when_ready = spec.start_when_ready;
        let job = self.append(spec)?;
        if start_when_ready {
            self.start_when_ready(&job);
        }
        Ok(job)
    }

    /// Create and append a job without touching the host.
    pub(crate) fn append(&self, spec: JobSpec<H>) -> Result<Arc<Job>, SchedulerError> {
        let on_tick = self.bind(spec.on_tick);
        let on_complete = spec.on_complete.map(|callback| self.bind(callback));

        let timer = self
            .timers
            .create(&spec.schedule, &spec.options, on_tick, on_complete)?;
        let job = Arc::new(Job::new(spec.name, spec.schedule, timer));

        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job.clone());
        info!(
            job = ?job.name(),
            uuid = %job.id(),
            cron = %job.schedule(),
            start_when_ready = spec.start_when_ready,
            "Job registered"
        );
        Ok(job)
    }

    /// Queue `job` to start once the host is ready.
    pub(crate) fn start_when_ready(&self, job: &Arc<Job>) {
        if let Some(host) = self.host.upgrade() {
            let job = job.clone();
            host.after_ready(Box::new(move || job.start()));
        }
    }

    /// First job, in creation order, whose name equals `name`.
    pub fn get_job_by_name(&self, name: &str) -> Option<Arc<Job>> {
        self.read()
            .iter()
            .find(|job| job.name() == Some(name))
            .cloned()
    }

    /// Start every job in creation order, running ones included.
    pub fn start_all_jobs(&self) {
        for job in self.jobs() {
            job.start();
        }
    }

    /// Stop every job in creation order, stopped ones included.
    pub fn stop_all_jobs(&self) {
        for job in self.jobs() {
            job.stop();
        }
    }

    /// Snapshot of all jobs in creation order.
    pub fn jobs(&self) -> Vec<Arc<Job>> {
        self.read().clone()
    }

    /// Number of jobs.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no job has been created.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Job>>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close a host-taking callback over this registry's host.
    fn bind(&self, callback: JobCallback<H>) -> TimerCallback {
        let host = self.host.clone();
        Arc::new(move || {
            if let Some(host) = host.upgrade() {
                callback(host.as_ref());
            }
        })
    }
}

impl<H: Host> fmt::Debug for JobRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &*self.read())
            .finish()
    }
}
