//! Scenario 3: a failing task is reported through `on_error` and the worker
//! keeps serving subsequent tasks.

use accel_dispatch_core::{Callbacks, ConfigMap, Dispatcher, DispatcherConfig};
use color_eyre::eyre::{Result, ensure};
use std::sync::{Arc, Mutex};

#[path = "support/payload.rs"]
mod payload;
#[path = "support/paths.rs"]
mod paths;
use payload::DemoPayload;
use paths::demo_worker_path;

#[test]
fn process_error() -> Result<()> {
    let config = DispatcherConfig::new(demo_worker_path(), vec![0], 4)?;
    let dispatcher = Dispatcher::new(config);

    let errors: Arc<Mutex<Vec<(u64, String, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let successes: Arc<Mutex<Vec<(u64, i64, u32)>>> = Arc::new(Mutex::new(Vec::new()));

    let recorded_success = Arc::clone(&successes);
    let mut on_success = move |task_id: u64, result: i64, worker_id: u32| {
        recorded_success
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((task_id, result, worker_id));
    };
    let recorded_error = Arc::clone(&errors);
    let mut on_error = move |task_id: u64, error_text: String, worker_id: u32| {
        recorded_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((task_id, error_text, worker_id));
    };

    let mut callbacks = Callbacks::new(&mut on_success);
    callbacks.on_error = Some(&mut on_error);

    let generator = vec![DemoPayload::failing(), DemoPayload::value(21)].into_iter();
    dispatcher.run(generator, 0, None, ConfigMap::new(), &mut callbacks)?;

    let errors = errors.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    ensure!(errors.len() == 1, "expected exactly one error, got {}", errors.len());
    let (task_id, error_text, worker_id) = &errors[0];
    ensure!(*task_id == 0, "failing task should be task 0, got {task_id}");
    ensure!(error_text.contains("boom"), "unexpected error text: {error_text}");
    ensure!(*worker_id == 0, "unexpected worker id: {worker_id}");

    let successes = successes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    ensure!(successes.len() == 1, "expected exactly one success, got {}", successes.len());
    ensure!(successes[0] == (1, 42, 0), "unexpected surviving success: {:?}", successes[0]);

    Ok(())
}
