//! Dispatches a lazy stream of tasks across a fixed pool of
//! accelerator-pinned worker processes.
//!
//! A [`Dispatcher`] owns a pool of OS processes, one per configured
//! device, and streams a caller-supplied iterator through them: a single
//! feeder thread assigns each item a monotonically increasing task id and
//! pushes it onto a bounded queue; whichever worker is free next picks it
//! up, runs the caller's [`worker::Worker`] implementation against it in
//! its own process, and reports the outcome back through [`Callbacks`].
//!
//! The worker side of that contract lives in a *different* binary from the
//! one that constructs the [`Dispatcher`] — see [`worker::run_worker_main`]
//! for the entry point a worker binary's `main` should call.
//!
//! # Examples
//!
//! ```ignore
//! use accel_dispatch_core::{Callbacks, ConfigMap, Dispatcher, DispatcherConfig};
//! use std::path::PathBuf;
//!
//! let config = DispatcherConfig::new(PathBuf::from("./target/debug/my_worker"), vec![0, 1], 16)?;
//! let dispatcher = Dispatcher::new(config);
//!
//! let mut on_success = |task_id: u64, result: i64, worker_id: u32| {
//!     println!("task {task_id} on worker {worker_id} produced {result}");
//! };
//! let mut callbacks = Callbacks::new(&mut on_success);
//!
//! dispatcher.run((0..100i64), 42, None, ConfigMap::new(), &mut callbacks)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod dispatcher;
pub mod error;
mod observability;
pub mod protocol;
mod queue;
#[cfg(any(doc, feature = "test-support"))]
pub mod test_support;
pub mod worker;

pub use config::{ConfigMap, DispatcherConfig};
pub use dispatcher::{CLEANUP_FAILURE_TASK_ID, Callbacks, Dispatcher, ShutdownHandle};
pub use error::{Error, Result};
pub use protocol::OutcomeMessage;
pub use worker::{Worker, run_worker_main};
