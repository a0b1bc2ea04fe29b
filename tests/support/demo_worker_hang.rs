//! Test-only worker binary whose `process` never returns.
//!
//! Used to exercise the dispatcher's shutdown escalation: a worker that
//! cannot drain its remaining stdin because it is permanently blocked
//! inside `process` can only be stopped by `SIGTERM`/`SIGKILL`, never by
//! its shutdown sentinel.

use accel_dispatch_core::config::ConfigMap;
use accel_dispatch_core::worker::{Worker, run_worker_main};

struct HangingWorker;

impl Worker for HangingWorker {
    type Payload = ();
    type Output = ();
    type Error = String;

    fn setup(_device_id: u32, _seed: u64, _config: &ConfigMap) -> Result<Self, Self::Error> {
        Ok(Self)
    }

    fn process(&mut self, (): Self::Payload) -> Result<Self::Output, Self::Error> {
        loop {
            std::thread::sleep(std::time::Duration::from_secs(3600));
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    run_worker_main::<HangingWorker>()?;
    Ok(())
}
