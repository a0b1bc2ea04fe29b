//! Shutdown flag plumbing and the three-level process-termination
//! escalation (sentinel, then `SIGTERM`, then `SIGKILL`).
//!
//! The escalation mirrors the grace-then-terminate-then-kill pattern used
//! elsewhere for stopping a long-lived child process: poll for a graceful
//! exit, then ask nicely, then insist.

use crate::config::{SENTINEL_GRACE, TERMINATE_GRACE};
use crate::observability::LOG_TARGET;
use std::process::Child;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Interval between liveness polls while waiting for a child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag observed by the feeder and, on supporting platforms, by
/// signal handlers.
pub(crate) type ShutdownFlag = Arc<AtomicBool>;

/// A caller-held, cloneable request to stop an in-progress [`crate::Dispatcher::run`].
///
/// Safe to invoke from any thread, including a signal handler, because it
/// only performs a single atomic store.
#[derive(Clone)]
pub struct ShutdownHandle(ShutdownFlag);

impl ShutdownHandle {
    pub(crate) const fn new(flag: ShutdownFlag) -> Self {
        Self(flag)
    }

    /// Requests that the run currently in progress drain and stop.
    ///
    /// Calling this more than once is equivalent to calling it once.
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Waits for `child` to exit on its own; if it has not done so within
/// `sentinel_grace` of receiving its shutdown sentinel, sends `SIGTERM` and
/// waits `terminate_grace` more; if it is still alive, sends `SIGKILL` and
/// blocks until the kernel reaps it.
pub(crate) fn escalate_stop(child: &mut Child, device_id: u32) {
    if wait_for_exit(child, SENTINEL_GRACE) {
        return;
    }

    tracing::warn!(
        target: LOG_TARGET,
        device_id,
        grace_secs = SENTINEL_GRACE.as_secs(),
        "worker did not exit after its shutdown sentinel; sending SIGTERM"
    );
    send_signal(child.id(), libc::SIGTERM);

    if wait_for_exit(child, TERMINATE_GRACE) {
        return;
    }

    tracing::warn!(
        target: LOG_TARGET,
        device_id,
        grace_secs = TERMINATE_GRACE.as_secs(),
        "worker did not exit after SIGTERM; sending SIGKILL"
    );
    send_signal(child.id(), libc::SIGKILL);

    if let Err(err) = child.wait() {
        tracing::error!(
            target: LOG_TARGET,
            device_id,
            error = %err,
            "failed to reap worker after SIGKILL"
        );
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            Err(_) => return false,
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}


fn send_signal(pid: u32, signal: i32) {
    let pid = i32::try_from(pid).unwrap_or(i32::MAX);
    // SAFETY: `pid` names a child process owned by this dispatcher, obtained
    // directly from `Child::id`. Sending a signal to a process we spawned
    // and still hold a handle to is the standard POSIX escalation pattern;
    // if it has already exited this is a harmless no-op (ESRCH, ignored).
    unsafe {
        libc::kill(pid, signal);
    }
}
