//! Test-only worker binary exercising the happy path, process errors,
//! per-task timeouts, and setup failures, all driven by its payload and
//! bootstrap config rather than by separate code paths.

use accel_dispatch_core::config::ConfigMap;
use accel_dispatch_core::worker::{Worker, run_worker_main};

#[path = "payload.rs"]
mod payload;
use payload::DemoPayload;

struct DemoWorker;

impl Worker for DemoWorker {
    type Payload = DemoPayload;
    type Output = i64;
    type Error = String;

    fn setup(device_id: u32, _seed: u64, config: &ConfigMap) -> Result<Self, Self::Error> {
        let fail_setup = config
            .get("fail_setup_devices")
            .and_then(serde_json::Value::as_array)
            .is_some_and(|devices| {
                devices
                    .iter()
                    .filter_map(serde_json::Value::as_u64)
                    .any(|d| d == u64::from(device_id))
            });
        if fail_setup {
            return Err(format!("setup failed for device {device_id}"));
        }
        Ok(Self)
    }

    fn process(&mut self, payload: Self::Payload) -> Result<Self::Output, Self::Error> {
        if payload.sleep_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(payload.sleep_ms));
        }
        if payload.fail {
            return Err("boom".to_owned());
        }
        Ok(payload.value * 2)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    run_worker_main::<DemoWorker>()?;
    Ok(())
}
