//! Domain error types for the accelerator task-dispatch engine.

use color_eyre::Report;
use thiserror::Error;

/// Result alias for operations that may return a [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for dispatcher-run fallible operations.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Result alias for worker-spawn fallible operations.
pub type SpawnResult<T> = std::result::Result<T, WorkerSpawnError>;

/// Result alias for configuration fallible operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for a worker process's own `main`.
pub type WorkerMainResult<T> = std::result::Result<T, WorkerMainError>;

/// Top-level error exposed by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Indicates a run ended in a fatal, non-recoverable condition.
    #[error("dispatch failed")]
    Dispatch(#[from] DispatchError),
    /// Indicates a worker process could not be started.
    #[error("worker spawn failed")]
    Spawn(#[from] WorkerSpawnError),
    /// Indicates the dispatcher was constructed with invalid parameters.
    #[error("configuration invalid")]
    Config(#[from] ConfigError),
}

/// Captures fatal failures that end a [`crate::Dispatcher::run`] call early.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct DispatchError(#[from] Report);

/// Captures failures encountered while starting a single worker process.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct WorkerSpawnError(#[from] Report);

/// Captures invalid [`crate::Dispatcher`] construction parameters.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] Report);

/// Captures the startup failures a worker process's own `main` must report
/// before it can enter its consumption loop: a missing or unreadable
/// bootstrap payload path. Task-level and cleanup failures are never
/// reported this way; they are written to stdout as `OutcomeMessage`
/// records instead.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct WorkerMainError(#[from] Report);

impl From<WorkerSpawnError> for DispatchError {
    fn from(err: WorkerSpawnError) -> Self {
        let WorkerSpawnError(report) = err;
        Self(report)
    }
}

impl From<ConfigError> for DispatchError {
    fn from(err: ConfigError) -> Self {
        let ConfigError(report) = err;
        Self(report)
    }
}

impl From<Error> for DispatchError {
    fn from(err: Error) -> Self {
        match err {
            Error::Dispatch(inner) => inner,
            Error::Spawn(inner) => inner.into(),
            Error::Config(inner) => inner.into(),
        }
    }
}
