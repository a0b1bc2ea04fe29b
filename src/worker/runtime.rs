//! Worker-process entry point: the steady-state consumption loop described
//! by the worker runtime component.
//!
//! This module runs *inside* the spawned worker process. It owns the
//! worker's stdin (task direction) and stdout (outcome direction), and is
//! the only place the [`Worker`] contract is invoked.

use crate::config::BootstrapPayload;
use crate::error::{WorkerMainError, WorkerMainResult};
use crate::protocol::{OutcomeMessage, WorkerInbound};
use crate::worker::contract::Worker;
use color_eyre::eyre::Context as _;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::sync::mpsc;
use std::time::Duration;

/// Runs the worker-process main loop for `W`.
///
/// Intended to be called from a worker binary's own `main`, which decides
/// how to report a returned error:
///
/// ```ignore
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     accel_dispatch_core::worker::run_worker_main::<MyWorker>()?;
///     Ok(())
/// }
/// ```
///
/// Reads the bootstrap payload path from `argv[1]`, runs `setup`, then
/// consumes [`WorkerInbound`] messages from stdin until a `Shutdown`
/// sentinel arrives or stdin closes, emitting [`OutcomeMessage`] records to
/// stdout as it goes. Always runs `cleanup` before returning, unless
/// `setup` itself failed.
///
/// # Errors
///
/// Returns [`WorkerMainError`] if `argv[1]` is missing or the bootstrap
/// payload at that path cannot be read or parsed. A failing `setup`,
/// `process`, or `cleanup` is never surfaced this way — it is reported to
/// the controlling process as an [`OutcomeMessage`] on stdout instead.
pub fn run_worker_main<W: Worker>() -> WorkerMainResult<()> {
    let payload_path = std::env::args().nth(1).ok_or_else(|| {
        WorkerMainError::from(color_eyre::eyre::eyre!(
            "usage: <worker-binary> <bootstrap-payload-path>"
        ))
    })?;

    let bootstrap = load_bootstrap(&payload_path)?;

    let device_id = bootstrap.device_id;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let worker = match W::setup(bootstrap.device_id, bootstrap.seed, &bootstrap.config) {
        Ok(worker) => worker,
        Err(err) => {
            write_outcome(
                &mut out,
                &OutcomeMessage::<W::Output>::SetupFailed {
                    device_id,
                    error_text: err.to_string(),
                },
            );
            return Ok(());
        }
    };
    let worker = Arc::new(Mutex::new(worker));

    run_loop(&worker, device_id, bootstrap.task_timeout_secs, &mut out);

    // The loop above only returns once no task is in flight on this thread,
    // but a previously abandoned (timed-out) task may still be holding the
    // lock. Waiting here for that lock keeps `cleanup` from racing a task
    // that is still actually running.
    let mut guard = worker
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Err(err) = guard.cleanup() {
        write_outcome(
            &mut out,
            &OutcomeMessage::<W::Output>::CleanupFailed {
                device_id,
                error_text: err.to_string(),
            },
        );
    }
    Ok(())
}

fn load_bootstrap(path: &str) -> WorkerMainResult<BootstrapPayload> {
    let file = std::fs::File::open(path)
        .context("failed to open worker bootstrap payload")
        .map_err(WorkerMainError::from)?;
    let payload = serde_json::from_reader(file)
        .context("failed to parse worker bootstrap payload")
        .map_err(WorkerMainError::from)?;
    Ok(payload)
}

fn run_loop<W: Worker>(
    worker: &Arc<Mutex<W>>,
    device_id: u32,
    task_timeout_secs: Option<f64>,
    out: &mut impl Write,
) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(inbound) = serde_json::from_str::<WorkerInbound<W::Payload>>(&line) else {
            break;
        };
        let envelope = match inbound {
            WorkerInbound::Shutdown => break,
            WorkerInbound::Task(envelope) => envelope,
        };

        write_outcome(
            out,
            &OutcomeMessage::<W::Output>::TaskStarted {
                task_id: envelope.task_id,
                worker_id: device_id,
            },
        );

        let outcome = run_one_task(
            worker,
            envelope.task_id,
            device_id,
            envelope.payload,
            task_timeout_secs,
        );
        write_outcome(out, &outcome);
    }
}

fn run_one_task<W: Worker>(
    worker: &Arc<Mutex<W>>,
    task_id: u64,
    worker_id: u32,
    payload: W::Payload,
    task_timeout_secs: Option<f64>,
) -> OutcomeMessage<W::Output> {
    let Some(timeout_seconds) = task_timeout_secs else {
        let mut guard = worker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        return finish(task_id, worker_id, guard.process(payload));
    };

    run_with_timeout(worker, task_id, worker_id, payload, timeout_seconds)
}

/// Runs `process` on a detached helper thread and waits on it with a bound.
///
/// A fired timeout does not forcibly interrupt the helper thread — Rust
/// offers no sound way to preempt arbitrary, non-cooperative user code.
/// Instead the main loop stops waiting, reports the timeout, and reads the
/// next line from stdin immediately; the lock the helper thread holds on
/// `worker` is simply left for it to release whenever `process` actually
/// returns. If a subsequent task's helper thread needs the same lock before
/// that happens, it blocks on the lock rather than on the main loop, so the
/// controlling process keeps seeing progress (outcome messages, further
/// task reads) even while one invocation is still abandoned in the
/// background. This is advisory cancellation, not forced preemption.
fn run_with_timeout<W: Worker>(
    worker: &Arc<Mutex<W>>,
    task_id: u64,
    worker_id: u32,
    payload: W::Payload,
    timeout_seconds: f64,
) -> OutcomeMessage<W::Output> {
    let timeout = Duration::from_secs_f64(timeout_seconds.max(0.0));
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(worker);

    let handle = std::thread::spawn(move || {
        let mut guard = worker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let result = guard.process(payload);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            // The thread already sent its result; join it to avoid leaking
            // a detached handle for work that has, in fact, finished.
            let _ = handle.join();
            finish(task_id, worker_id, result)
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            // Let the helper thread run to completion on its own; joining
            // here would reintroduce the blocking we are trying to avoid.
            drop(handle);
            OutcomeMessage::TaskTimeout {
                task_id,
                timeout_seconds,
                worker_id,
            }
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let _ = handle.join();
            OutcomeMessage::TaskError {
                task_id,
                error_text: "worker thread disconnected before reporting a result".to_owned(),
                worker_id,
            }
        }
    }
}

fn finish<O, E: std::fmt::Display>(
    task_id: u64,
    worker_id: u32,
    result: Result<O, E>,
) -> OutcomeMessage<O> {
    match result {
        Ok(result) => OutcomeMessage::TaskSuccess {
            task_id,
            result,
            worker_id,
        },
        Err(err) => OutcomeMessage::TaskError {
            task_id,
            error_text: err.to_string(),
            worker_id,
        },
    }
}

fn write_outcome<O: serde::Serialize>(out: &mut impl Write, outcome: &OutcomeMessage<O>) {
    let Ok(line) = serde_json::to_string(outcome) else {
        return;
    };
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}
