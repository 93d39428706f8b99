//! Host capabilities the job registry depends on, and an in-process host.
//!
//! A host is the long-running application that owns the registry. The
//! registry needs exactly three things from it: somewhere to hang named
//! capabilities, a way to run code once startup has finished, and a way to
//! run code once at shutdown.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::SchedulerError;

/// One-shot lifecycle hook.
pub type HostHook = Box<dyn FnOnce() + Send + 'static>;

/// Capability shared through the host.
pub type Decoration = Arc<dyn Any + Send + Sync>;

/// What a host must provide to carry a job registry.
pub trait Host: Send + Sync + 'static {
    /// Attach a named capability.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyDecorated` if `name` is taken.
    fn decorate(&self, name: &'static str, capability: Decoration) -> Result<(), SchedulerError>;

    /// Look up a capability by name.
    fn decoration(&self, name: &str) -> Option<Decoration>;

    /// Run `hook` once the host has finished starting up.
    ///
    /// If the host is already ready the hook may run before this returns.
    fn after_ready(&self, hook: HostHook);

    /// Run `hook` exactly once when the host shuts down.
    fn on_close(&self, hook: HostHook);
}

/// Lifecycle phase of a [`ServerHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    /// Plugins are still being registered.
    Booting,
    /// Startup finished; ready hooks have run.
    Ready,
    /// Shutdown ran; close hooks have run.
    Closed,
}

struct Lifecycle {
    phase: HostPhase,
    ready_hooks: Vec<HostHook>,
    close_hooks: Vec<HostHook>,
    /// Thread currently running ready hooks.
    dispatching: Option<ThreadId>,
}

/// In-process host with decorations and ready/close hooks.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use hostcron_scheduler::{Host, HostPhase, ServerHost};
///
/// let host = Arc::new(ServerHost::new("api"));
/// host.after_ready(Box::new(|| println!("ready")));
/// host.ready();
/// assert_eq!(host.phase(), HostPhase::Ready);
/// host.close();
/// ```
pub struct ServerHost {
    name: String,
    started_at: Instant,
    decorations: RwLock<HashMap<&'static str, Decoration>>,
    lifecycle: Mutex<Lifecycle>,
    dispatch_done: Condvar,
}

impl ServerHost {
    /// Create a host in the `Booting` phase.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Instant::now(),
            decorations: RwLock::new(HashMap::new()),
            lifecycle: Mutex::new(Lifecycle {
                phase: HostPhase::Booting,
                ready_hooks: Vec::new(),
                close_hooks: Vec::new(),
                dispatching: None,
            }),
            dispatch_done: Condvar::new(),
        }
    }

    /// Host name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time since the host was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> HostPhase {
        self.lifecycle().phase
    }

    /// Whether startup has finished and the host is not closed.
    pub fn is_ready(&self) -> bool {
        self.phase() == HostPhase::Ready
    }

    /// Typed lookup of a decoration.
    pub fn decoration_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.decoration(name)?.downcast::<T>().ok()
    }

    /// Signal that startup has finished and run pending ready hooks in
    /// registration order. Calling it again is a no-op.
    ///
    /// A hook never runs once the host is closed, even if `close` is called
    /// while earlier hooks are still running.
    pub fn ready(&self) {
        let hooks = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.phase != HostPhase::Booting {
                return;
            }
            lifecycle.phase = HostPhase::Ready;
            lifecycle.dispatching = Some(thread::current().id());
            std::mem::take(&mut lifecycle.ready_hooks)
        };
        let _dispatch = Dispatch(self);

        info!(host = %self.name, hooks = hooks.len(), "Host ready");
        let total = hooks.len();
        for (ran, hook) in hooks.into_iter().enumerate() {
            if self.phase() == HostPhase::Closed {
                warn!(
                    host = %self.name,
                    skipped = total - ran,
                    "Host closed during startup; skipping ready hooks"
                );
                break;
            }
            hook();
        }
    }

    /// Shut the host down and run close hooks in registration order.
    /// Calling it again is a no-op.
    ///
    /// Waits for ready hooks running on another thread to finish first.
    pub fn close(&self) {
        let hooks = {
            let me = thread::current().id();
            let mut lifecycle = self.lifecycle();
            while matches!(lifecycle.dispatching, Some(id) if id != me) {
                lifecycle = self
                    .dispatch_done
                    .wait(lifecycle)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if lifecycle.phase == HostPhase::Closed {
                return;
            }
            lifecycle.phase = HostPhase::Closed;
            lifecycle.ready_hooks.clear();
            std::mem::take(&mut lifecycle.close_hooks)
        };

        info!(host = %self.name, hooks = hooks.len(), "Host closing");
        for hook in hooks {
            hook();
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the ready-hook dispatch marker, also when a hook panics.
struct Dispatch<'a>(&'a ServerHost);

impl Drop for Dispatch<'_> {
    fn drop(&mut self) {
        self.0.lifecycle().dispatching = None;
        self.0.dispatch_done.notify_all();
    }
}

impl Host for ServerHost {
    fn decorate(&self, name: &'static str, capability: Decoration) -> Result<(), SchedulerError> {
        let mut decorations = self
            .decorations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if decorations.contains_key(name) {
            return Err(SchedulerError::AlreadyDecorated(name.to_string()));
        }
        decorations.insert(name, capability);
        Ok(())
    }

    fn decoration(&self, name: &str) -> Option<Decoration> {
        self.decorations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn after_ready(&self, hook: HostHook) {
        let mut lifecycle = self.lifecycle();
        match lifecycle.phase {
            HostPhase::Booting => lifecycle.ready_hooks.push(hook),
            HostPhase::Ready => {
                drop(lifecycle);
                hook();
            }
            HostPhase::Closed => {
                warn!(host = %self.name, "Ready hook registered after close; dropping it");
            }
        }
    }

    fn on_close(&self, hook: HostHook) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.phase == HostPhase::Closed {
            warn!(host = %self.name, "Close hook registered after close; dropping it");
            return;
        }
        lifecycle.close_hooks.push(hook);
    }
}
