//! Turning configured job entries into job specs.

use std::sync::Arc;

use tokio::process::Command;
use tracing::{error, info, warn};

use hostcron_scheduler::{JobSpec, ServerHost};

use crate::settings::{JobAction, JobEntry};

/// Build the initial job list. Disabled entries become `None` so their
/// position is kept but nothing is created for them.
pub fn build_specs(entries: &[JobEntry]) -> Vec<Option<JobSpec<ServerHost>>> {
    entries
        .iter()
        .map(|entry| entry.enabled.then(|| build_spec(entry)))
        .collect()
}

/// Build the spec for a single entry, ignoring `enabled`.
pub fn build_spec(entry: &JobEntry) -> JobSpec<ServerHost> {
    let label: Arc<str> = entry.name.as_deref().unwrap_or("unnamed").into();

    let tick_label = label.clone();
    let tick = entry.action.clone();
    let mut spec = JobSpec::new(entry.schedule.clone(), move |host: &ServerHost| {
        run_action(&tick, &tick_label, host)
    })
    .with_options(entry.options.clone());

    if let Some(name) = &entry.name {
        spec = spec.with_name(name.clone());
    }
    if entry.start_when_ready {
        spec = spec.start_when_ready();
    }
    if let Some(action) = entry.on_complete.clone() {
        spec = spec.on_complete(move |host: &ServerHost| run_action(&action, &label, host));
    }
    spec
}

/// Execute an action on behalf of `job`.
pub fn run_action(action: &JobAction, job: &str, host: &ServerHost) {
    match action {
        JobAction::Log { message } => {
            info!(
                host = host.name(),
                job,
                uptime_secs = host.uptime().as_secs(),
                "{}",
                message
            );
        }
        JobAction::Command { program, args } => {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!(job, program = %program, "No runtime to run command on; skipping");
                return;
            };
            let job = job.to_string();
            let program = program.clone();
            let args = args.clone();
            runtime.spawn(async move {
                match Command::new(&program).args(&args).status().await {
                    Ok(status) if status.success() => {
                        info!(job = %job, program = %program, "Command finished");
                    }
                    Ok(status) => {
                        warn!(job = %job, program = %program, code = ?status.code(), "Command failed");
                    }
                    Err(e) => {
                        error!(job = %job, program = %program, error = %e, "Command could not be started");
                    }
                }
            });
        }
    }
}
