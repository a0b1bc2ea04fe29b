//! Shared payload type for the demo worker binaries and the tests that
//! drive them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoPayload {
    pub value: i64,
    pub sleep_ms: u64,
    pub fail: bool,
}

impl DemoPayload {
    pub fn value(value: i64) -> Self {
        Self {
            value,
            sleep_ms: 0,
            fail: false,
        }
    }

    pub fn sleeping(value: i64, sleep_ms: u64) -> Self {
        Self {
            value,
            sleep_ms,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            value: 0,
            sleep_ms: 0,
            fail: true,
        }
    }
}
