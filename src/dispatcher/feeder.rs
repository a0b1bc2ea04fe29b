//! The feeder: the single producer that turns the caller's lazy sequence
//! into tasks on the shared queue.

use crate::dispatcher::shutdown::ShutdownFlag;
use crate::observability::LOG_TARGET;
use crate::queue::TaskEnvelope;
use crossbeam::channel::{SendTimeoutError, Sender};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// How long the feeder waits on a full queue before re-checking the
/// shutdown flag.
const SEND_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of a feeder run, reported back to the dispatcher after the
/// feeder thread is joined.
pub(crate) struct FeederOutcome {
    /// `true` if the user-supplied generator panicked mid-iteration.
    pub(crate) generator_panicked: bool,
}

/// Runs the feeder to completion on the calling thread.
///
/// Intended to be the body of a dedicated feeder thread. Assigns task
/// identifiers starting at zero, in generator order, and stops either when
/// the generator is exhausted or when `shutdown` is observed — in the
/// latter case the in-flight item, if any, is dropped rather than enqueued.
pub(crate) fn run_feeder<P: Send + 'static>(
    mut generator: impl Iterator<Item = P>,
    task_tx: &Sender<TaskEnvelope<P>>,
    shutdown: &ShutdownFlag,
) -> FeederOutcome {
    let mut next_task_id: u64 = 0;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            tracing::debug!(target: LOG_TARGET, "feeder observed shutdown; stopping");
            break;
        }

        let next = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| generator.next()));
        let payload = match next {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::debug!(target: LOG_TARGET, "feeder generator exhausted");
                break;
            }
            Err(_) => {
                tracing::error!(target: LOG_TARGET, "feeder generator panicked");
                shutdown.store(true, Ordering::SeqCst);
                return FeederOutcome {
                    generator_panicked: true,
                };
            }
        };

        let task_id = next_task_id;
        next_task_id += 1;
        let mut envelope = TaskEnvelope { task_id, payload };

        loop {
            match task_tx.send_timeout(envelope, SEND_POLL_INTERVAL) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if shutdown.load(Ordering::SeqCst) {
                        tracing::debug!(
                            target: LOG_TARGET,
                            task_id,
                            "feeder observed shutdown while queue was full; dropping in-flight item"
                        );
                        return FeederOutcome {
                            generator_panicked: false,
                        };
                    }
                    envelope = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        "task queue disconnected; stopping feeder"
                    );
                    return FeederOutcome {
                        generator_panicked: false,
                    };
                }
            }
        }
    }

    FeederOutcome {
        generator_panicked: false,
    }
}
