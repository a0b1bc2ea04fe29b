//! The dispatcher: owns the queues, the worker set, and the feeder, and
//! exposes the single blocking entry point, `run`.

mod callbacks;
mod feeder;
mod monitor;
mod shutdown;
mod spawn;

pub use callbacks::{CLEANUP_FAILURE_TASK_ID, Callbacks};
pub use shutdown::ShutdownHandle;

use crate::config::{ConfigMap, DispatcherConfig};
use crate::error::DispatchResult;
use crate::observability::LOG_TARGET;
use crate::queue::{sentinel_channel, task_channel};
use crossbeam::channel::unbounded;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shutdown::ShutdownFlag;
use spawn::{MonitorEvent, SpawnedWorker, spawn_worker};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::info_span;

/// Orchestrates a fixed pool of accelerator-pinned worker processes
/// consuming a lazy stream of tasks.
///
/// Construct once, then call [`Dispatcher::run`] any number of times; each
/// call spawns a fresh set of worker processes and tears them down before
/// returning.
pub struct Dispatcher {
    config: DispatcherConfig,
    shutdown: ShutdownFlag,
}

impl Dispatcher {
    /// Builds a dispatcher from validated configuration.
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a cloneable handle that can request this dispatcher's
    /// current or next [`Dispatcher::run`] to stop.
    ///
    /// Obtain this before calling `run` so it can be handed to a signal
    /// handler or another thread.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.shutdown))
    }

    /// Streams `generator` through the configured worker pool, blocking
    /// until every task has been dispatched and every worker has exited.
    ///
    /// `base_seed` plus each worker's ordinal position (0-based, in
    /// `device_ids` order) is passed to that worker's `setup`. `config` is
    /// forwarded verbatim. `task_timeout`, if set, bounds each individual
    /// task; see the worker runtime's cancellation semantics for what
    /// happens when it elapses.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DispatchError`] if a worker process cannot
    /// be spawned, or if `generator` itself panics mid-iteration — the run
    /// still drains and every worker still exits cleanly first, but the
    /// panic is surfaced to the caller as an `Err` rather than swallowed.
    /// Task-level failures (a `process` call returning `Err`, timing out,
    /// or a worker's `setup`/`cleanup` failing) are never surfaced this
    /// way; they are reported through `callbacks` only, per the
    /// dispatcher's error-handling design.
    pub fn run<P, R>(
        &self,
        generator: impl Iterator<Item = P> + Send + 'static,
        base_seed: u64,
        task_timeout: Option<Duration>,
        config: ConfigMap,
        callbacks: &mut Callbacks<'_, R>,
    ) -> DispatchResult<()>
    where
        P: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        self.shutdown.store(false, std::sync::atomic::Ordering::SeqCst);
        let span = info_span!(target: LOG_TARGET, "dispatcher_run", workers = self.config.device_ids.len());
        let _entered = span.enter();

        let result = self.run_inner(generator, base_seed, task_timeout, config, callbacks);

        if let Some(on_exit) = callbacks.on_exit.as_deref_mut() {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(on_exit)).is_err() {
                tracing::error!(target: LOG_TARGET, "on_exit callback panicked");
            }
        }

        result
    }

    fn run_inner<P, R>(
        &self,
        generator: impl Iterator<Item = P> + Send + 'static,
        base_seed: u64,
        task_timeout: Option<Duration>,
        config: ConfigMap,
        callbacks: &mut Callbacks<'_, R>,
    ) -> DispatchResult<()>
    where
        P: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let (task_tx, task_rx) = task_channel::<P>(self.config.queue_size);
        let (sentinel_tx, sentinel_rx) = sentinel_channel();
        let (event_tx, event_rx) = unbounded::<MonitorEvent<R>>();

        let mut workers: Vec<SpawnedWorker> = Vec::with_capacity(self.config.device_ids.len());
        for (ordinal, &device_id) in self.config.device_ids.iter().enumerate() {
            let seed = base_seed.wrapping_add(u64::try_from(ordinal).unwrap_or(u64::MAX));
            let spawn_result = spawn_worker::<P, R>(
                &self.config.worker_binary,
                device_id,
                seed,
                &config,
                task_timeout,
                task_rx.clone(),
                sentinel_rx.clone(),
                Arc::clone(&self.shutdown),
                event_tx.clone(),
            );
            match spawn_result {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    tracing::error!(
                        target: LOG_TARGET,
                        device_id,
                        error = %err,
                        "failed to spawn worker; aborting startup"
                    );
                    drop(sentinel_tx);
                    for worker in &mut workers {
                        shutdown::escalate_stop(&mut worker.child, worker.device_id);
                    }
                    for worker in workers {
                        worker.join_threads();
                    }
                    return Err(err.into());
                }
            }
        }
        drop(task_rx);
        drop(sentinel_rx);
        drop(event_tx);

        let worker_count = workers.len();
        let shutdown = Arc::clone(&self.shutdown);
        let feeder_task_tx = task_tx.clone();
        let feeder_handle = std::thread::spawn(move || {
            feeder::run_feeder(generator, &feeder_task_tx, &shutdown)
        });

        // Dropping the dispatcher's clone of `task_tx` once the feeder has
        // finished, together with dropping `sentinel_tx`, is what lets the
        // forwarders' `select!` observe "no more tasks, no more sentinel"
        // and exit. The coordinator below owns exactly that handoff.
        let coordinator = std::thread::spawn(move || {
            let outcome = feeder_handle.join().unwrap_or(feeder::FeederOutcome {
                generator_panicked: true,
            });
            drop(task_tx);
            drop(sentinel_tx);
            outcome
        });

        monitor::run_monitor_loop(&event_rx, worker_count, &self.shutdown, callbacks);

        // Escalated concurrently: a worker stuck inside a non-cooperative
        // call must not make every other worker wait its turn for the same
        // sentinel/terminate/kill ladder.
        std::thread::scope(|scope| {
            for worker in &mut workers {
                let device_id = worker.device_id;
                let child = &mut worker.child;
                scope.spawn(move || shutdown::escalate_stop(child, device_id));
            }
        });
        for worker in workers {
            worker.join_threads();
        }

        let outcome = coordinator.join().unwrap_or(feeder::FeederOutcome {
            generator_panicked: true,
        });

        if outcome.generator_panicked {
            return Err(crate::error::DispatchError::from(color_eyre::eyre::eyre!(
                "task generator panicked during dispatch"
            )));
        }

        Ok(())
    }
}
