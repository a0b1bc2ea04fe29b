//! The lifecycle contract a user implements to run inside a worker process.

use crate::config::ConfigMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Hosts one instance of user work on one accelerator device for the
/// lifetime of a worker process.
///
/// Implementations are constructed exactly once, inside the worker process,
/// by [`crate::worker::run_worker_main`] — never in the controlling
/// process. Heavy initialisation belongs in [`Worker::setup`], not in the
/// type's own construction, because [`Worker::setup`] is the only
/// lifecycle point that receives the device id and seed.
///
/// `Send + 'static` is required because a configured per-task timeout runs
/// `process` on a helper thread the main loop can walk away from without
/// waiting for it; see [`crate::worker::run_worker_main`] for the full
/// cancellation semantics.
pub trait Worker: Sized + Send + 'static {
    /// Opaque, user-defined work item received from the task queue.
    type Payload: DeserializeOwned + Send + 'static;
    /// Value returned by [`Worker::process`] on success.
    type Output: Serialize + Send + 'static;
    /// Error type returned by any lifecycle method.
    type Error: std::fmt::Display + Send + 'static;

    /// Runs once, before any task is dequeued. Failure here prevents the
    /// worker from entering its consumption loop at all.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` when device or model initialisation fails.
    fn setup(device_id: u32, seed: u64, config: &ConfigMap) -> Result<Self, Self::Error>;

    /// Runs once per dequeued task.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` when the task cannot be completed.
    fn process(&mut self, payload: Self::Payload) -> Result<Self::Output, Self::Error>;

    /// Runs once, after the consumption loop ends, regardless of why it
    /// ended. The default implementation does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` when resources cannot be released cleanly.
    fn cleanup(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
