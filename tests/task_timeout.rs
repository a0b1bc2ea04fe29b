//! Scenario 2: a task that overruns its budget is reported as a timeout and
//! the worker keeps serving subsequent tasks.
//!
//! The timed-out task's helper thread is left running in the background
//! (see the cancellation note on `run_with_timeout`), so the next task's own
//! helper thread has to wait out whatever is left of that abandoned call
//! before it can acquire the worker lock. The durations below leave enough
//! headroom for that residual wait to fit inside the second task's own
//! timeout budget.

use accel_dispatch_core::{Callbacks, ConfigMap, Dispatcher, DispatcherConfig};
use color_eyre::eyre::{Result, ensure};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[path = "support/payload.rs"]
mod payload;
#[path = "support/paths.rs"]
mod paths;
use payload::DemoPayload;
use paths::demo_worker_path;

#[test]
fn task_timeout() -> Result<()> {
    let config = DispatcherConfig::new(demo_worker_path(), vec![0], 4)?;
    let dispatcher = Dispatcher::new(config);

    let timeouts: Arc<Mutex<Vec<(u64, f64, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let successes: Arc<Mutex<Vec<(u64, i64, u32)>>> = Arc::new(Mutex::new(Vec::new()));

    let recorded_success = Arc::clone(&successes);
    let mut on_success = move |task_id: u64, result: i64, worker_id: u32| {
        recorded_success
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((task_id, result, worker_id));
    };
    let recorded_timeout = Arc::clone(&timeouts);
    let mut on_timeout = move |task_id: u64, timeout_seconds: f64, worker_id: u32| {
        recorded_timeout
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((task_id, timeout_seconds, worker_id));
    };

    let mut callbacks = Callbacks::new(&mut on_success);
    callbacks.on_timeout = Some(&mut on_timeout);

    let generator = vec![DemoPayload::sleeping(0, 700), DemoPayload::sleeping(1, 0)].into_iter();
    dispatcher.run(
        generator,
        0,
        Some(Duration::from_millis(500)),
        ConfigMap::new(),
        &mut callbacks,
    )?;

    let timeouts = timeouts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    ensure!(timeouts.len() == 1, "expected exactly one timeout, got {}", timeouts.len());
    let (task_id, timeout_seconds, worker_id) = timeouts[0];
    ensure!(task_id == 0, "timed-out task should be task 0, got {task_id}");
    ensure!(
        (timeout_seconds - 0.5).abs() < f64::EPSILON,
        "unexpected reported timeout: {timeout_seconds}"
    );
    ensure!(worker_id == 0, "unexpected worker id: {worker_id}");

    let successes = successes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    ensure!(successes.len() == 1, "expected exactly one success, got {}", successes.len());
    ensure!(successes[0].0 == 1, "surviving success should be task 1");

    Ok(())
}
