//! Scenario 1: every task lands on some worker and every worker is used.

use accel_dispatch_core::{Callbacks, ConfigMap, Dispatcher, DispatcherConfig};
use color_eyre::eyre::{Result, ensure};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[path = "support/payload.rs"]
mod payload;
#[path = "support/paths.rs"]
mod paths;
use payload::DemoPayload;
use paths::demo_worker_path;

#[test]
fn happy_path() -> Result<()> {
    let config = DispatcherConfig::new(demo_worker_path(), vec![0, 1, 2, 3], 4)?;
    let dispatcher = Dispatcher::new(config);

    let successes: Arc<Mutex<Vec<(u64, i64, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let exits = Arc::new(Mutex::new(0u32));

    let recorded = Arc::clone(&successes);
    let mut on_success = move |task_id: u64, result: i64, worker_id: u32| {
        recorded.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push((
            task_id, result, worker_id,
        ));
    };
    let exit_count = Arc::clone(&exits);
    let mut on_exit = move || {
        *exit_count.lock().unwrap_or_else(std::sync::PoisonError::into_inner) += 1;
    };

    let mut callbacks = Callbacks::new(&mut on_success);
    callbacks.on_exit = Some(&mut on_exit);

    let generator = [10i64, 20, 30, 40, 50].into_iter().map(DemoPayload::value);
    dispatcher.run(generator, 0, None, ConfigMap::new(), &mut callbacks)?;

    let successes = successes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    ensure!(successes.len() == 5, "expected 5 successes, got {}", successes.len());

    let mut results: Vec<i64> = successes.iter().map(|(_, result, _)| *result).collect();
    results.sort_unstable();
    ensure!(
        results == vec![20, 40, 60, 80, 100],
        "unexpected result multiset: {results:?}"
    );

    let workers: HashSet<u32> = successes.iter().map(|(_, _, worker_id)| *worker_id).collect();
    ensure!(
        workers.iter().all(|w| (0..4).contains(w)),
        "unexpected worker id in {workers:?}"
    );

    ensure!(
        *exits.lock().unwrap_or_else(std::sync::PoisonError::into_inner) == 1,
        "on_exit must fire exactly once"
    );

    Ok(())
}
