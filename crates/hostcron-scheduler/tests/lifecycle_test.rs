//! Registry behaviour across a host's lifecycle: registration, readiness,
//! runtime job creation and shutdown.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hostcron_scheduler::{
    cron, register, CronOptions, CronTimerFactory, JobRegistry, JobSpec, ManualTimerFactory,
    SchedulerConfig, SchedulerError, ServerHost, TimerEvent,
};

fn counting_spec(schedule: &str, counter: &Arc<AtomicU32>) -> JobSpec<ServerHost> {
    let counter = counter.clone();
    JobSpec::new(schedule, move |_: &ServerHost| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

fn boot(
    jobs: Vec<Option<JobSpec<ServerHost>>>,
) -> (Arc<ServerHost>, Arc<ManualTimerFactory>, Arc<JobRegistry<ServerHost>>) {
    let host = Arc::new(ServerHost::new("test-host"));
    let timers = Arc::new(ManualTimerFactory::new());
    let registry = register(&host, CronOptions::with_jobs(jobs), timers.clone()).unwrap();
    (host, timers, registry)
}

#[test]
fn no_initial_jobs_means_empty_registry() {
    let (host, _timers, _registry) = boot(Vec::new());
    host.ready();

    let registry = cron(&*host).unwrap();
    assert_eq!(registry.len(), 0);
}

#[test]
fn seeded_jobs_do_not_start_on_ready() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, timers, registry) = boot(vec![Some(counting_spec("* * * * *", &ticks))]);
    host.ready();

    let jobs = registry.jobs();
    assert_eq!(jobs.len(), 1);
    assert!(!jobs[0].is_running());

    // a fire while stopped never reaches the callback
    assert!(!timers.timer(0).unwrap().fire());
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}

#[test]
fn start_when_ready_runs_after_ready_then_stops() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, timers, registry) = boot(vec![Some(
        counting_spec("* * * * *", &ticks).start_when_ready(),
    )]);

    assert!(!registry.jobs()[0].is_running());
    host.ready();
    assert!(registry.jobs()[0].is_running());

    assert!(timers.timer(0).unwrap().fire());
    assert_eq!(ticks.load(Ordering::SeqCst), 1);

    registry.stop_all_jobs();
    assert!(!registry.jobs()[0].is_running());
}

#[test]
fn seeded_job_found_by_name() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, _timers, registry) = boot(vec![Some(
        counting_spec("* * * * *", &ticks).with_name("foo"),
    )]);
    host.ready();

    let job = registry.get_job_by_name("foo").unwrap();
    assert!(!job.is_running());
}

#[test]
fn disabled_placeholders_are_ignored() {
    let ticks = Arc::new(AtomicU32::new(0));
    let enabled = false;
    let (host, _timers, registry) = boot(vec![
        enabled.then(|| counting_spec("* * * * *", &ticks).with_name("foo")),
    ]);
    host.ready();

    assert!(registry.get_job_by_name("foo").is_none());
    assert!(registry.is_empty());
}

#[test]
fn runtime_job_is_not_started_by_default() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, _timers, _registry) = boot(Vec::new());
    host.ready();

    let registry = cron(&*host).unwrap();
    registry
        .create_job(counting_spec("* * * * *", &ticks).with_name("foo"))
        .unwrap();

    assert_eq!(registry.len(), 1);
    let job = registry.get_job_by_name("foo").unwrap();
    assert!(!job.is_running());
    registry.stop_all_jobs();
}

#[test]
fn runtime_job_with_start_when_ready_starts_at_once() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, _timers, registry) = boot(Vec::new());
    host.ready();

    let job = registry
        .create_job(counting_spec("* * * * *", &ticks).start_when_ready())
        .unwrap();
    assert!(job.is_running());
    registry.stop_all_jobs();
}

#[test]
fn stop_all_is_idempotent() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, _timers, registry) = boot(vec![
        Some(counting_spec("* * * * *", &ticks)),
        Some(counting_spec("*/5 * * * *", &ticks).start_when_ready()),
    ]);

    // never started: stopping is harmless
    registry.stop_all_jobs();
    host.ready();
    registry.stop_all_jobs();
    registry.stop_all_jobs();

    assert!(registry.jobs().iter().all(|job| !job.is_running()));
}

#[test]
fn creation_order_is_preserved() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let spec = |name: &'static str| {
        let order = order.clone();
        JobSpec::new("* * * * *", move |_: &ServerHost| {
            order.lock().unwrap().push(name);
        })
        .with_name(name)
    };
    let (host, timers, registry) = boot(vec![Some(spec("a")), Some(spec("b")), Some(spec("c"))]);
    host.ready();

    let names: Vec<_> = registry
        .jobs()
        .iter()
        .map(|job| job.name().unwrap().to_string())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);

    registry.start_all_jobs();
    assert_eq!(
        timers.events(),
        [
            TimerEvent::Started(0),
            TimerEvent::Started(1),
            TimerEvent::Started(2)
        ]
    );
    for timer in timers.timers() {
        timer.fire();
    }
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);

    host.close();
    assert_eq!(
        timers.events()[3..],
        [
            TimerEvent::Stopped(0),
            TimerEvent::Stopped(1),
            TimerEvent::Stopped(2)
        ]
    );
}

#[test]
fn host_close_completes_running_jobs() {
    let completed = Arc::new(Mutex::new(Vec::new()));
    let spec = |name: &'static str| {
        let completed = completed.clone();
        JobSpec::new("* * * * *", |_: &ServerHost| {})
            .with_name(name)
            .on_complete(move |host: &ServerHost| {
                completed.lock().unwrap().push((name, host.name().to_string()));
            })
    };
    let (host, _timers, _registry) = boot(vec![
        Some(spec("running").start_when_ready()),
        Some(spec("idle")),
    ]);
    host.ready();

    host.close();
    assert_eq!(
        *completed.lock().unwrap(),
        vec![("running", "test-host".to_string())]
    );
}

#[test]
fn host_close_stops_everything() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, _timers, registry) = boot(vec![
        Some(counting_spec("* * * * *", &ticks).start_when_ready()),
        Some(counting_spec("* * * * *", &ticks)),
    ]);
    host.ready();
    registry.start_all_jobs();

    host.close();
    assert!(registry.jobs().iter().all(|job| !job.is_running()));
}

#[test]
fn invalid_seed_entry_fails_registration() {
    let host = Arc::new(ServerHost::new("test-host"));
    let ticks = Arc::new(AtomicU32::new(0));
    let result = register(
        &host,
        CronOptions::with_jobs(vec![
            Some(counting_spec("* * * * *", &ticks)),
            Some(counting_spec("every tuesday", &ticks)),
        ]),
        Arc::new(ManualTimerFactory::new()),
    );

    let err = result.unwrap_err();
    assert!(err.is_schedule_error());
    assert!(cron(&*host).is_none());
}

#[test]
fn invalid_runtime_job_leaves_existing_jobs_alone() {
    let ticks = Arc::new(AtomicU32::new(0));
    let (host, _timers, registry) = boot(vec![Some(
        counting_spec("* * * * *", &ticks).start_when_ready(),
    )]);
    host.ready();

    let result = registry.create_job(counting_spec("not-a-cron", &ticks));
    assert!(matches!(result, Err(SchedulerError::InvalidCron(_))));
    assert_eq!(registry.len(), 1);
    assert!(registry.jobs()[0].is_running());
}

#[test]
fn job_callback_reaches_host_decorations() {
    let (host, timers, registry) = boot(Vec::new());
    let seen = Arc::new(AtomicU32::new(0));
    let s = seen.clone();
    registry
        .create_job(JobSpec::new("* * * * *", move |host: &ServerHost| {
            // the registry itself is reachable from inside a tick
            let jobs = cron(host).map(|r| r.len()).unwrap_or_default();
            s.store(jobs as u32, Ordering::SeqCst);
        }))
        .unwrap();
    host.ready();

    registry.start_all_jobs();
    timers.timer(0).unwrap().fire();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn cron_timer_ticks_after_ready() {
    let host = Arc::new(ServerHost::new("live"));
    let timers = Arc::new(CronTimerFactory::from_current(SchedulerConfig::default()).unwrap());
    let ticks = Arc::new(AtomicU32::new(0));
    let registry = register(
        &host,
        CronOptions::with_jobs(vec![Some(
            counting_spec("* * * * * *", &ticks)
                .with_name("every-second")
                .start_when_ready(),
        )]),
        timers,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);

    host.ready();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(ticks.load(Ordering::SeqCst) >= 1);

    let job = registry.get_job_by_name("every-second").unwrap();
    assert!(job.last_tick().is_some());
    assert!(job.next_tick().is_some());

    host.close();
    assert!(!job.is_running());
    let after_close = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), after_close);
}
