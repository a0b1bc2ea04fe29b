//! The worker runtime: the process-local loop that owns one device, runs
//! the user body, and emits outcome messages.
//!
//! Everything in this module executes inside a spawned worker process, not
//! in the controlling process that owns a [`crate::Dispatcher`].

mod contract;
mod runtime;

pub use contract::Worker;
pub use runtime::run_worker_main;
