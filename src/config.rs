//! Dispatcher construction and per-worker bootstrap configuration.

use crate::error::{ConfigError, ConfigResult};
use color_eyre::eyre::eyre;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on the number of tasks the task queue may hold before the
/// feeder blocks.
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

/// How often the monitor loop and feeder poll for shutdown between blocking
/// operations.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Grace period granted to a worker between receiving its shutdown sentinel
/// and being escalated to `SIGTERM`.
pub const SENTINEL_GRACE: Duration = Duration::from_millis(500);

/// Grace period granted to a worker between `SIGTERM` and `SIGKILL`.
pub const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// Free-form configuration forwarded verbatim to a worker's `setup`.
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

/// Validated construction parameters for a [`crate::Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Path to the compiled worker binary, invoked once per device.
    pub(crate) worker_binary: PathBuf,
    /// One entry per worker to spawn; also used as that worker's `device_id`.
    pub(crate) device_ids: Vec<u32>,
    /// Bound on the number of tasks buffered ahead of the workers.
    pub(crate) queue_size: usize,
}

impl DispatcherConfig {
    /// Validates and constructs dispatcher configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `device_ids` is empty or `queue_size` is
    /// zero.
    pub fn new(
        worker_binary: PathBuf,
        device_ids: Vec<u32>,
        queue_size: usize,
    ) -> ConfigResult<Self> {
        if device_ids.is_empty() {
            return Err(ConfigError::from(eyre!(
                "device_ids must contain at least one device"
            )));
        }
        if queue_size == 0 {
            return Err(ConfigError::from(eyre!("queue_size must be at least 1")));
        }
        Ok(Self {
            worker_binary,
            device_ids,
            queue_size,
        })
    }
}

/// Bootstrap payload handed to a freshly spawned worker process.
///
/// Serialised to a temporary file and passed to the worker binary by path,
/// mirroring how one-shot worker invocations receive their settings
/// elsewhere in this crate's ancestry.
#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapPayload {
    /// Device this worker is pinned to; also its `worker_id`.
    pub device_id: u32,
    /// Seed forwarded to `setup`, derived from `base_seed` and the worker's
    /// ordinal position.
    pub seed: u64,
    /// Free-form configuration forwarded verbatim to `setup`.
    pub config: ConfigMap,
    /// Per-task timeout, in seconds, or `None` if timeouts are disabled.
    pub task_timeout_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::DispatcherConfig;
    use rstest::rstest;
    use std::path::PathBuf;

    #[rstest]
    #[case(vec![], 4, false)]
    #[case(vec![0], 0, false)]
    #[case(vec![0, 1], 4, true)]
    fn validates_construction_parameters(
        #[case] device_ids: Vec<u32>,
        #[case] queue_size: usize,
        #[case] expect_ok: bool,
    ) {
        let result = DispatcherConfig::new(PathBuf::from("/bin/true"), device_ids, queue_size);
        assert_eq!(result.is_ok(), expect_ok);
    }
}
