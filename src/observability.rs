//! Shared tracing configuration for observability instrumentation.
//!
//! Centralises the log target used by the crate so subscribers can filter
//! dispatcher events without pulling in unrelated application logs.

/// Target used by dispatcher spans and logs.
pub(crate) const LOG_TARGET: &str = "accel_dispatch::observability";
