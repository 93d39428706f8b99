//! Command implementations for the cron daemon.
//!
//! Handles:
//! - start: Load config, attach the job registry to a host, run until signalled
//! - stop: Signal running daemon to stop (via PID file)
//! - status: Check if daemon is running
//! - check: Validate configured jobs without running them

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::signal;
use tracing::{info, warn};

use hostcron_scheduler::{register, CronOptions, CronTimerFactory, ServerHost};

use crate::jobs::build_specs;
use crate::pidfile::{terminate, PidFile, PidState};
use crate::settings::Settings;

fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Start the cron daemon.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Attach the job registry to a fresh host, seeding configured jobs
/// 3. Signal readiness, which starts `start_when_ready` jobs
/// 4. On SIGINT/SIGTERM close the host, stopping every job
pub async fn start_daemon(
    config_path: Option<&str>,
    host_name_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<()> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(host_name) = host_name_override {
        settings.host_name = host_name.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    init_tracing(&settings.log_level)?;

    info!("Cron daemon starting...");
    info!("  Host name: {}", settings.host_name);
    info!("  Default timezone: {}", settings.scheduler.default_timezone);
    info!("  Jobs configured: {} ({} enabled)", settings.jobs.len(), settings.enabled_jobs());

    let host = Arc::new(ServerHost::new(settings.host_name.clone()));
    let timers = CronTimerFactory::from_current(settings.scheduler.clone())
        .context("Failed to create timer factory")?;
    let registry = register(
        &host,
        CronOptions::with_jobs(build_specs(&settings.jobs)),
        Arc::new(timers),
    )
    .context("Failed to register jobs")?;

    let _pid = PidFile::for_settings(&settings).claim()?;

    host.ready();
    let running = registry.jobs().iter().filter(|job| job.is_running()).count();
    info!(jobs = registry.len(), running, "Cron daemon ready");

    shutdown_signal().await;

    host.close();
    info!("Cron daemon stopped");

    Ok(())
}

/// Stop the running daemon by sending SIGTERM.
pub fn stop_daemon(config_path: Option<&str>) -> Result<()> {
    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    let pid_file = PidFile::for_settings(&settings);

    match pid_file.state() {
        PidState::Missing => {
            anyhow::bail!("No PID file at {:?} - daemon may not be running", pid_file.path())
        }
        PidState::Stale(pid) => {
            pid_file.clear();
            anyhow::bail!("Daemon not running (stale PID {} removed)", pid)
        }
        PidState::Running(pid) => {
            terminate(pid)?;
            println!("Sent SIGTERM to daemon (PID {})", pid);
            Ok(())
        }
    }
}

/// Show daemon status.
pub fn show_status(config_path: Option<&str>) -> Result<()> {
    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    let pid_file = PidFile::for_settings(&settings);

    match pid_file.state() {
        PidState::Running(pid) => println!(
            "Cron daemon is running (PID {}, {} job(s) enabled)",
            pid,
            settings.enabled_jobs()
        ),
        PidState::Stale(pid) => println!("Cron daemon is NOT running (stale PID {})", pid),
        PidState::Missing => println!("Cron daemon is NOT running"),
    }
    println!("PID file: {:?}", pid_file.path());
    Ok(())
}

/// Validation result for one configured job.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Configured name
    pub name: Option<String>,
    /// Cron expression
    pub schedule: String,
    /// Whether the entry is enabled
    pub enabled: bool,
    /// Next fire time (enabled jobs only)
    pub next_tick: Option<DateTime<Utc>>,
}

/// Validate every configured job by registering them on a host that is
/// never made ready, so nothing starts.
///
/// Must be called from within a tokio runtime.
pub fn check_jobs(settings: &Settings) -> Result<Vec<JobReport>> {
    let host = Arc::new(ServerHost::new(settings.host_name.clone()));
    let timers = CronTimerFactory::from_current(settings.scheduler.clone())
        .context("Failed to create timer factory")?;
    let registry = register(
        &host,
        CronOptions::with_jobs(build_specs(&settings.jobs)),
        Arc::new(timers),
    )
    .context("Invalid job configuration")?;

    let mut created = registry.jobs().into_iter();
    let reports = settings
        .jobs
        .iter()
        .map(|entry| {
            let next_tick = if entry.enabled {
                created.next().and_then(|job| job.next_tick())
            } else {
                None
            };
            JobReport {
                name: entry.name.clone(),
                schedule: entry.schedule.clone(),
                enabled: entry.enabled,
                next_tick,
            }
        })
        .collect();

    host.close();
    Ok(reports)
}

/// Print the validation report for the configured jobs.
pub fn check_config(config_path: Option<&str>) -> Result<()> {
    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    let reports = check_jobs(&settings)?;

    if reports.is_empty() {
        println!("No jobs configured");
        return Ok(());
    }

    println!("{:<24} {:<20} {:<8} NEXT RUN", "NAME", "SCHEDULE", "ENABLED");
    for report in &reports {
        let next = report
            .next_tick
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<20} {:<8} {}",
            report.name.as_deref().unwrap_or("-"),
            report.schedule,
            report.enabled,
            next
        );
    }
    println!("{} job(s) OK", reports.len());
    Ok(())
}
