//! The monitor loop: drains worker outcomes into user callbacks and tracks
//! when every worker has reached a terminal state.

use crate::config::SHUTDOWN_POLL_INTERVAL;
use crate::dispatcher::callbacks::{CLEANUP_FAILURE_TASK_ID, Callbacks};
use crate::dispatcher::shutdown::ShutdownFlag;
use crate::dispatcher::spawn::MonitorEvent;
use crate::observability::LOG_TARGET;
use crate::protocol::OutcomeMessage;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::Ordering;

/// Runs the monitor loop to completion on the calling thread.
///
/// Returns once every one of `worker_count` workers has reported exit (its
/// stdout has closed), which only happens after it has received its
/// shutdown sentinel, finished any in-flight task, and run `cleanup` — or,
/// if `shutdown` is observed set first, as soon as the current poll
/// iteration ends. In the latter case some workers may still be alive; the
/// caller is responsible for forcing them to exit, since a worker stuck
/// inside a non-cooperative `process` call may never read its sentinel at
/// all.
pub(crate) fn run_monitor_loop<R>(
    event_rx: &Receiver<MonitorEvent<R>>,
    worker_count: usize,
    shutdown: &ShutdownFlag,
    callbacks: &mut Callbacks<'_, R>,
) {
    let mut remaining = worker_count;

    while remaining > 0 {
        match event_rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
            Ok(MonitorEvent::Outcome(outcome)) => dispatch(outcome, callbacks),
            Ok(MonitorEvent::WorkerExited { device_id }) => {
                tracing::debug!(target: LOG_TARGET, device_id, "worker exited");
                remaining -= 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.load(Ordering::SeqCst) {
                    tracing::debug!(
                        target: LOG_TARGET,
                        remaining,
                        "shutdown requested; forcing remaining workers to exit"
                    );
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn dispatch<R>(outcome: OutcomeMessage<R>, callbacks: &mut Callbacks<'_, R>) {
    match outcome {
        OutcomeMessage::TaskStarted { task_id, worker_id } => {
            if let Some(hook) = callbacks.on_task_start.as_deref_mut() {
                invoke(|| hook(task_id, worker_id));
            }
        }
        OutcomeMessage::TaskSuccess {
            task_id,
            result,
            worker_id,
        } => {
            invoke(|| (callbacks.on_success)(task_id, result, worker_id));
        }
        OutcomeMessage::TaskError {
            task_id,
            error_text,
            worker_id,
        } => {
            if let Some(hook) = callbacks.on_error.as_deref_mut() {
                invoke(|| hook(task_id, error_text, worker_id));
            }
        }
        OutcomeMessage::TaskTimeout {
            task_id,
            timeout_seconds,
            worker_id,
        } => {
            if let Some(hook) = callbacks.on_timeout.as_deref_mut() {
                invoke(|| hook(task_id, timeout_seconds, worker_id));
            }
        }
        OutcomeMessage::SetupFailed {
            device_id,
            error_text,
        } => {
            if let Some(hook) = callbacks.on_setup_fail.as_deref_mut() {
                invoke(|| hook(device_id, error_text));
            }
        }
        OutcomeMessage::CleanupFailed {
            device_id,
            error_text,
        } => {
            tracing::warn!(
                target: LOG_TARGET,
                device_id,
                error = %error_text,
                "worker cleanup failed"
            );
            if let Some(hook) = callbacks.on_error.as_deref_mut() {
                let message = format!("cleanup failed on device {device_id}: {error_text}");
                invoke(move || hook(CLEANUP_FAILURE_TASK_ID, message, device_id));
            }
        }
    }
}

/// Runs a callback, catching and logging a panic rather than letting it
/// escape into the monitor loop.
fn invoke(callback: impl FnOnce()) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)).is_err() {
        tracing::error!(target: LOG_TARGET, "user callback panicked; continuing run");
    }
}
