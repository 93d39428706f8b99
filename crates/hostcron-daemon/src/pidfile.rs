//! PID file tracking the running daemon.
//!
//! `start` claims the file for the lifetime of the process; `stop` and
//! `status` read it back to find the daemon.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::settings::Settings;

/// What the PID file says about the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidState {
    /// No PID file, or one without a readable PID.
    Missing,
    /// The recorded process is alive.
    Running(u32),
    /// The recorded process is gone.
    Stale(u32),
}

/// Location of the daemon's PID file.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configured PID file, or the per-user default.
    pub fn for_settings(settings: &Settings) -> Self {
        Self::new(settings.pid_file.clone().unwrap_or_else(default_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inspect the recorded PID.
    pub fn state(&self) -> PidState {
        let pid = fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok());
        match pid {
            None => PidState::Missing,
            Some(pid) if process_alive(pid) => PidState::Running(pid),
            Some(pid) => PidState::Stale(pid),
        }
    }

    /// Record this process, refusing if another live daemon holds the file.
    ///
    /// The file is removed when the returned guard drops.
    pub fn claim(&self) -> Result<PidGuard> {
        let own = std::process::id();
        if let PidState::Running(pid) = self.state() {
            if pid != own {
                bail!("Daemon already running (PID {}, {:?})", pid, self.path);
            }
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(&self.path, own.to_string())
            .with_context(|| format!("Failed to write PID file {:?}", self.path))?;
        info!(path = ?self.path, pid = own, "Wrote PID file");

        Ok(PidGuard { file: self.clone() })
    }

    /// Delete the file if present.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = ?self.path, "Removed PID file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "Failed to remove PID file"),
        }
    }
}

/// Removes the PID file on drop.
#[derive(Debug)]
pub struct PidGuard {
    file: PidFile,
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        self.file.clear();
    }
}

/// `hostcron/hostcron.pid` under the runtime dir, falling back to the cache dir.
pub fn default_path() -> PathBuf {
    let base = directories::BaseDirs::new().map(|dirs| {
        dirs.runtime_dir()
            .unwrap_or_else(|| dirs.cache_dir())
            .to_path_buf()
    });
    base.unwrap_or_else(std::env::temp_dir)
        .join("hostcron")
        .join("hostcron.pid")
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 probes for existence; EPERM means it exists but is not ours.
    (unsafe { libc::kill(pid, 0) == 0 })
        || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Ask the daemon with `pid` to shut down.
#[cfg(unix)]
pub fn terminate(pid: u32) -> Result<()> {
    let raw = libc::pid_t::try_from(pid).context("PID out of range")?;
    if unsafe { libc::kill(raw, libc::SIGTERM) } != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("Failed to send SIGTERM to PID {}", pid));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn terminate(_pid: u32) -> Result<()> {
    bail!("Stopping the daemon is only supported on unix")
}
