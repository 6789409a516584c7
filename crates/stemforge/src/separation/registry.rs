//! Job registry
//!
//! Maps a job key to the engine process currently running for it, so a job
//! can be cancelled from outside the thread driving it.
//!
//! ```text
//! SeparationService (owns Arc<JobRegistry>)
//!     │
//!     ├─► register()   ← EngineRun::spawn, before the first line
//!     ├─► cancel()     ← SeparationService::cancel / CLI signal
//!     └─► release()    ← EngineRun drop, on every exit path
//! ```
//!
//! Second-pass engine runs are registered under derived keys
//! (`"<job>:<target>"`, see [`derived_key`]). Cancelling the job key only
//! reaches whichever run is registered under that exact key.

use std::collections::HashMap;
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Key for a second-pass sub-invocation of `job_key`
pub fn derived_key(job_key: &str, target: &str) -> String {
    format!("{}:{}", job_key, target)
}

struct ProcessSlot {
    child: Mutex<Child>,
    pid: u32,
    cancelled: AtomicBool,
}

/// Shared handle to a live engine process
///
/// Clones refer to the same process. The registry and the owning
/// [`EngineRun`](super::engine::EngineRun) each hold one.
#[derive(Clone)]
pub struct ProcessHandle(Arc<ProcessSlot>);

impl ProcessHandle {
    pub fn new(child: Child) -> Self {
        let pid = child.id();
        Self(Arc::new(ProcessSlot {
            child: Mutex::new(child),
            pid,
            cancelled: AtomicBool::new(false),
        }))
    }

    pub fn pid(&self) -> u32 {
        self.0.pid
    }

    /// True once [`cancel`](Self::cancel) killed the live process
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Non-blocking exit check
    pub fn try_wait(&self) -> std::io::Result<Option<ExitStatus>> {
        match self.0.child.lock() {
            Ok(mut child) => child.try_wait(),
            Err(poisoned) => poisoned.into_inner().try_wait(),
        }
    }

    /// Kill the process if it is still running
    ///
    /// Returns true only if a live process was killed. A process that has
    /// already exited is left alone and not marked cancelled.
    pub fn cancel(&self) -> bool {
        let mut child = match self.0.child.lock() {
            Ok(child) => child,
            Err(poisoned) => poisoned.into_inner(),
        };

        match child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) => {
                if let Err(e) = child.kill() {
                    log::warn!("[JOBS] Failed to kill pid {}: {}", self.0.pid, e);
                    return false;
                }
                // kill also succeeds on a process that exited after try_wait
                // but was not reaped yet; only the exit status tells them apart
                match child.wait() {
                    Ok(status) if !killed_by_us(&status) => {
                        log::debug!("[JOBS] pid {} exited ({}) before kill", self.0.pid, status);
                        false
                    }
                    Ok(_) => {
                        self.0.cancelled.store(true, Ordering::SeqCst);
                        true
                    }
                    Err(e) => {
                        log::warn!("[JOBS] Failed to reap pid {}: {}", self.0.pid, e);
                        self.0.cancelled.store(true, Ordering::SeqCst);
                        true
                    }
                }
            }
            Err(e) => {
                log::warn!("[JOBS] Failed to query pid {}: {}", self.0.pid, e);
                false
            }
        }
    }

    /// Kill (if needed) and reap the process
    pub(crate) fn terminate(&self) {
        let mut child = match self.0.child.lock() {
            Ok(child) => child,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Ok(None) = child.try_wait() {
            let _ = child.kill();
        }
        let _ = child.wait();
    }

    fn same_process(&self, other: &ProcessHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(unix)]
pub(super) fn killed_by_sigkill(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(9)
}

#[cfg(not(unix))]
pub(super) fn killed_by_sigkill(_status: &ExitStatus) -> bool {
    false
}

/// Whether `status` is the exit of a process ended by [`ProcessHandle::cancel`]
///
/// Without signals there is no way to tell; a successful kill counts.
fn killed_by_us(status: &ExitStatus) -> bool {
    cfg!(not(unix)) || killed_by_sigkill(status)
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.0.pid)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Job key → live engine process
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, ProcessHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process under `key`, replacing any previous entry
    pub fn register(&self, key: &str, handle: ProcessHandle) {
        let mut jobs = match self.jobs.write() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        log::debug!("[JOBS] Registered {} (pid {})", key, handle.pid());
        if let Some(previous) = jobs.insert(key.to_string(), handle) {
            log::warn!("[JOBS] {} replaced an entry for pid {}", key, previous.pid());
        }
    }

    pub fn lookup(&self, key: &str) -> Option<ProcessHandle> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    /// Kill the process registered under `key`
    ///
    /// Returns whether a live process was killed. The entry itself is
    /// removed by the owning run once it observes the exit.
    pub fn cancel(&self, key: &str) -> bool {
        match self.lookup(key) {
            Some(handle) => {
                let killed = handle.cancel();
                if killed {
                    log::info!("[JOBS] Cancelled {} (pid {})", key, handle.pid());
                } else {
                    log::debug!("[JOBS] {} already exited, nothing to cancel", key);
                }
                killed
            }
            None => {
                log::debug!("[JOBS] Cancel for unknown job {}", key);
                false
            }
        }
    }

    /// Remove `key` unconditionally (idempotent)
    pub fn deregister(&self, key: &str) {
        let mut jobs = match self.jobs.write() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        if jobs.remove(key).is_some() {
            log::debug!("[JOBS] Deregistered {}", key);
        }
    }

    /// Remove `key` only if it still refers to `handle`
    ///
    /// An entry that was overwritten by a newer run stays in place.
    pub fn release(&self, key: &str, handle: &ProcessHandle) {
        let mut jobs = match self.jobs.write() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        if jobs.get(key).is_some_and(|current| current.same_process(handle)) {
            jobs.remove(key);
            log::debug!("[JOBS] Released {} (pid {})", key, handle.pid());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Keys of all registered jobs, sorted
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.jobs.read() {
            Ok(jobs) => jobs.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        keys.sort();
        keys
    }
}
