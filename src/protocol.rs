//! Wire protocol exchanged between the controlling process and a worker.
//!
//! Messages are encoded one-per-line as JSON and carried over the worker's
//! stdin (task direction) and stdout (outcome direction). The protocol is a
//! closed set of shapes; there is no acknowledgement or heartbeat message —
//! backpressure is exerted entirely by the bounded task queue upstream of the
//! wire.

use serde::{Deserialize, Serialize};

/// A single unit of work, tagged with the identifier the feeder assigned it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope<P> {
    /// Monotonically increasing identifier assigned by the feeder.
    pub task_id: u64,
    /// Opaque, user-defined work item.
    pub payload: P,
}

/// A message sent from the controlling process to a worker over stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerInbound<P> {
    /// Deliver a task for processing.
    Task(TaskEnvelope<P>),
    /// Poison sentinel: the worker must finish its current task, run
    /// cleanup, and exit. Exactly one is sent per live worker during
    /// shutdown.
    Shutdown,
}

/// A message sent from a worker to the controlling process over stdout.
///
/// This is the closed set described by the outcome protocol: every emitted
/// record is one of these six variants and no others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeMessage<R> {
    /// The worker dequeued `task_id` and is about to invoke the user body.
    TaskStarted {
        /// Identifier of the task that started.
        task_id: u64,
        /// Identifier of the worker that started it.
        worker_id: u32,
    },
    /// The user body returned normally.
    TaskSuccess {
        /// Identifier of the completed task.
        task_id: u64,
        /// Value returned by the user body.
        result: R,
        /// Identifier of the worker that completed it.
        worker_id: u32,
    },
    /// The user body returned an error.
    TaskError {
        /// Identifier of the failed task.
        task_id: u64,
        /// Human-readable diagnostic describing the failure.
        error_text: String,
        /// Identifier of the worker that failed it.
        worker_id: u32,
    },
    /// The user body was still running when its per-task budget elapsed.
    TaskTimeout {
        /// Identifier of the timed-out task.
        task_id: u64,
        /// Configured per-task budget, in seconds.
        timeout_seconds: f64,
        /// Identifier of the worker that timed it out.
        worker_id: u32,
    },
    /// `setup` failed; this worker will not process any tasks.
    SetupFailed {
        /// Identifier of the device the worker was bound to.
        device_id: u32,
        /// Human-readable diagnostic describing the failure.
        error_text: String,
    },
    /// `cleanup` failed after the consumption loop ended.
    CleanupFailed {
        /// Identifier of the device the worker was bound to.
        device_id: u32,
        /// Human-readable diagnostic describing the failure.
        error_text: String,
    },
}

impl<R> OutcomeMessage<R> {
    /// Returns the worker identifier carried by this message, when the
    /// variant carries one.
    ///
    /// `SetupFailed` and `CleanupFailed` identify the device rather than a
    /// live worker, so this returns `None` for them.
    #[must_use]
    pub const fn worker_id(&self) -> Option<u32> {
        match self {
            Self::TaskStarted { worker_id, .. }
            | Self::TaskSuccess { worker_id, .. }
            | Self::TaskError { worker_id, .. }
            | Self::TaskTimeout { worker_id, .. } => Some(*worker_id),
            Self::SetupFailed { .. } | Self::CleanupFailed { .. } => None,
        }
    }
}
