//! Cron job registry for long-running hosts.
//!
//! Jobs are declared up front or created at runtime, each wrapping a cron
//! timer. A job only starts ticking when told to, or, with
//! `start_when_ready`, once its host signals that startup has finished.
//!
//! # Features
//!
//! - Cron expressions with optional seconds field, evaluated per timezone
//! - Append-only registry with first-match name lookup
//! - Bulk start/stop in creation order
//! - Callbacks receive the host as context
//! - All jobs stopped when the host closes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hostcron_scheduler::{register, CronOptions, CronTimerFactory, JobSpec, SchedulerConfig, ServerHost};
//!
//! let host = Arc::new(ServerHost::new("api"));
//! let timers = Arc::new(CronTimerFactory::from_current(SchedulerConfig::default())?);
//!
//! let registry = register(&host, CronOptions::with_jobs(vec![
//!     Some(JobSpec::new("*/5 * * * *", |host: &ServerHost| {
//!         tracing::info!(host = host.name(), "poll");
//!     }).start_when_ready()),
//! ]), timers)?;
//!
//! host.ready();   // the poll job starts here
//! host.close();   // and stops here
//! ```

mod binding;
mod config;
mod error;
mod host;
mod job;
mod registry;
mod timer;

pub use binding::{cron, register, CronOptions, DECORATOR_NAME};
pub use config::{parse_timezone, SchedulerConfig};
pub use error::SchedulerError;
pub use host::{Decoration, Host, HostHook, HostPhase, ServerHost};
pub use job::Job;
pub use registry::{JobCallback, JobRegistry, JobSpec};
pub use timer::{
    validate_cron_expression, CronTimer, CronTimerFactory, ManualTimer, ManualTimerFactory,
    ScheduleOptions, Timer, TimerCallback, TimerEvent, TimerFactory,
};
