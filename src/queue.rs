//! The task queue and the shutdown broadcast, both shared between the
//! feeder, the per-worker forwarders, and the monitor loop inside the
//! controlling process.
//!
//! True cross-process multi-consumer queues have no safe, portable Rust
//! primitive. This crate instead keeps the queue itself in-process, backed
//! by [`crossbeam::channel`] (natively multi-producer, multi-consumer), and
//! gives each spawned worker process a dedicated forwarder thread that
//! relays between the in-process queue and that worker's stdin/stdout
//! pipes. Backpressure still lands exactly where the specification
//! requires it: the feeder blocks on the bounded send into this channel.

use crossbeam::channel::{Receiver, Sender, bounded};

/// A task travelling through the task queue, tagged with its feeder-assigned
/// identifier.
#[derive(Debug, Clone)]
pub(crate) struct TaskEnvelope<P> {
    pub(crate) task_id: u64,
    pub(crate) payload: P,
}

/// Bounded, multi-consumer task channel.
pub(crate) fn task_channel<P>(
    capacity: usize,
) -> (Sender<TaskEnvelope<P>>, Receiver<TaskEnvelope<P>>) {
    bounded(capacity)
}

/// A broadcast-by-close shutdown sentinel.
///
/// Every worker forwarder holds a clone of the receiver. Dropping every
/// clone of the sender wakes every blocked receiver at once with
/// `Disconnected`, which each forwarder interprets as "deliver your
/// sentinel and exit" — the in-process equivalent of sending exactly one
/// poison message per worker.
pub(crate) fn sentinel_channel() -> (Sender<()>, Receiver<()>) {
    bounded(0)
}
