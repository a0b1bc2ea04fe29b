//! Paths to the demo worker binaries built alongside the test suite.
//!
//! Kept separate from `payload.rs` so that `demo_worker.rs` can pull in the
//! `DemoPayload` type without also pulling in `env!("CARGO_BIN_EXE_...")`
//! lookups that are only valid when compiled as part of an integration
//! test binary, not as part of the bin targets themselves.

/// Path to the `demo_worker` binary built alongside the test suite.
pub fn demo_worker_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_demo_worker"))
}

/// Path to the `demo_worker_hang` binary built alongside the test suite.
pub fn demo_worker_hang_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_demo_worker_hang"))
}
