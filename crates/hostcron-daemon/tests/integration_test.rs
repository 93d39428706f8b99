//! Integration tests for the cron daemon.
//!
//! These tests validate the path from a config file on disk through job
//! registration to host shutdown.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::time::sleep;

use hostcron_daemon::{build_specs, check_jobs, Settings};
use hostcron_scheduler::{cron, register, CronOptions, CronTimerFactory, ServerHost};

const CONFIG: &str = r#"
host_name = "integration"

[scheduler]
default_timezone = "UTC"

[[jobs]]
name = "every-second"
schedule = "* * * * * *"
start_when_ready = true
action = { kind = "log", message = "tick" }
on_complete = { kind = "log", message = "stopped" }

[[jobs]]
name = "nightly"
schedule = "0 2 * * *"
action = { kind = "command", program = "true" }
options = { timezone = "Europe/Paris" }

[[jobs]]
name = "retired"
schedule = "0 0 1 1 *"
enabled = false
action = { kind = "log", message = "never" }
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp config");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config");
    file
}

fn load(contents: &str) -> (NamedTempFile, Settings) {
    let file = write_config(contents);
    let settings = Settings::load(Some(&file.path().to_string_lossy())).expect("Failed to load");
    (file, settings)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_reports_every_entry() {
    let (_file, settings) = load(CONFIG);

    let reports = check_jobs(&settings).unwrap();
    assert_eq!(reports.len(), 3);

    let names: Vec<_> = reports.iter().map(|r| r.name.as_deref()).collect();
    assert_eq!(
        names,
        vec![Some("every-second"), Some("nightly"), Some("retired")]
    );

    assert!(reports[0].next_tick.is_some());
    assert!(reports[1].next_tick.is_some());
    assert!(!reports[2].enabled);
    assert!(reports[2].next_tick.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_fails_on_unknown_timezone() {
    let (_file, settings) = load(
        r#"
[[jobs]]
schedule = "* * * * *"
action = { kind = "log", message = "x" }
options = { timezone = "Mars/Olympus_Mons" }
"#,
    );

    assert!(check_jobs(&settings).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_configured_jobs_follow_host_lifecycle() {
    let (_file, settings) = load(CONFIG);

    let host = Arc::new(ServerHost::new(settings.host_name.clone()));
    let timers = CronTimerFactory::from_current(settings.scheduler.clone()).unwrap();
    let registry = register(
        &host,
        CronOptions::with_jobs(build_specs(&settings.jobs)),
        Arc::new(timers),
    )
    .unwrap();

    // Disabled entry is skipped
    assert_eq!(registry.len(), 2);
    assert!(cron(&*host).is_some());

    let fast = registry.get_job_by_name("every-second").unwrap();
    let nightly = registry.get_job_by_name("nightly").unwrap();
    assert!(registry.get_job_by_name("retired").is_none());
    assert!(!fast.is_running());

    host.ready();
    assert!(fast.is_running());
    assert!(!nightly.is_running());

    sleep(Duration::from_millis(2200)).await;
    assert!(fast.last_tick().is_some());

    host.close();
    assert!(!fast.is_running());
    assert!(!nightly.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_all_runs_jobs_not_started_on_ready() {
    let (_file, settings) = load(CONFIG);

    let host = Arc::new(ServerHost::new(settings.host_name.clone()));
    let timers = CronTimerFactory::from_current(settings.scheduler.clone()).unwrap();
    let registry = register(
        &host,
        CronOptions::with_jobs(build_specs(&settings.jobs)),
        Arc::new(timers),
    )
    .unwrap();

    registry.start_all_jobs();
    assert!(registry.jobs().iter().all(|job| job.is_running()));

    registry.stop_all_jobs();
    assert!(registry.jobs().iter().all(|job| !job.is_running()));

    host.close();
}
