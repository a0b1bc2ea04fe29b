//! Spawns one worker process and the pair of threads that bridge it to the
//! in-process task queue and result channel.

use crate::config::{BootstrapPayload, ConfigMap};
use crate::dispatcher::shutdown::ShutdownFlag;
use crate::error::{SpawnResult, WorkerSpawnError};
use crate::observability::LOG_TARGET;
use crate::protocol::{OutcomeMessage, TaskEnvelope as WireTaskEnvelope, WorkerInbound};
use crate::queue::TaskEnvelope;
use color_eyre::eyre::Context as _;
use crossbeam::channel::{Receiver, Sender, select};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::to_writer;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::Duration;
use tempfile::{NamedTempFile, TempPath};
use tracing::info_span;

/// An event reported by a worker's reader thread to the monitor loop.
pub(crate) enum MonitorEvent<R> {
    /// A decoded outcome message read from the worker's stdout.
    Outcome(OutcomeMessage<R>),
    /// The worker's stdout closed: the process has exited (gracefully or
    /// otherwise) and will report no further outcomes.
    WorkerExited { device_id: u32 },
}

/// A spawned worker process plus the threads bridging it to the queues.
pub(crate) struct SpawnedWorker {
    pub(crate) device_id: u32,
    pub(crate) child: Child,
    forwarder: JoinHandle<()>,
    reader: JoinHandle<()>,
    payload_path: TempPath,
}

impl SpawnedWorker {
    /// Joins the bridging threads. Call only after the worker's own process
    /// has exited (or been escalated to exit) so the threads have actually
    /// finished rather than being joined to a wait.
    pub(crate) fn join_threads(self) {
        let _ = self.forwarder.join();
        let _ = self.reader.join();
        if let Err(err) = self.payload_path.close() {
            tracing::warn!(
                target: LOG_TARGET,
                device_id = self.device_id,
                error = %err,
                "failed to remove worker bootstrap payload file"
            );
        }
    }
}

/// Spawns one worker process bound to `device_id` and wires it to the
/// shared task queue and result channel.
#[expect(
    clippy::too_many_arguments,
    reason = "spawning a worker requires all of its queue wiring and bootstrap parameters"
)]
pub(crate) fn spawn_worker<P, R>(
    worker_binary: &Path,
    device_id: u32,
    seed: u64,
    config: &ConfigMap,
    task_timeout: Option<Duration>,
    task_rx: Receiver<TaskEnvelope<P>>,
    sentinel_rx: crossbeam::channel::Receiver<()>,
    shutdown: ShutdownFlag,
    events: Sender<MonitorEvent<R>>,
) -> SpawnResult<SpawnedWorker>
where
    P: Serialize + Send + 'static,
    R: DeserializeOwned + Send + 'static,
{
    let span = info_span!(target: LOG_TARGET, "spawn_worker", device_id);
    let _entered = span.enter();

    let payload_path = write_bootstrap(device_id, seed, config, task_timeout)
        .map_err(WorkerSpawnError::from)?;

    let mut command = Command::new(worker_binary);
    command
        .arg(payload_path.as_os_str())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = command.spawn().map_err(|err| {
        WorkerSpawnError::from(color_eyre::Report::new(err).wrap_err("failed to spawn worker process"))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| WorkerSpawnError::from(color_eyre::eyre::eyre!("worker child missing stdin pipe")))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| WorkerSpawnError::from(color_eyre::eyre::eyre!("worker child missing stdout pipe")))?;

    let forwarder =
        std::thread::spawn(move || forwarder_loop(task_rx, sentinel_rx, &shutdown, device_id, stdin));
    let reader = std::thread::spawn(move || reader_loop::<R>(stdout, events, device_id));

    tracing::debug!(target: LOG_TARGET, device_id, "worker process spawned");

    Ok(SpawnedWorker {
        device_id,
        child,
        forwarder,
        reader,
        payload_path,
    })
}

fn write_bootstrap(
    device_id: u32,
    seed: u64,
    config: &ConfigMap,
    task_timeout: Option<Duration>,
) -> color_eyre::Result<TempPath> {
    let payload = BootstrapPayload {
        device_id,
        seed,
        config: config.clone(),
        task_timeout_secs: task_timeout.map(|t| t.as_secs_f64()),
    };
    let mut file = NamedTempFile::new().context("failed to create worker bootstrap file")?;
    to_writer(&mut file, &payload).context("failed to serialise worker bootstrap payload")?;
    file.flush().context("failed to flush worker bootstrap payload")?;
    Ok(file.into_temp_path())
}

/// Relays tasks from the shared queue to one worker's stdin until the
/// worker's shutdown sentinel fires or the task queue disconnects.
///
/// Once `shutdown` is set, any task still buffered in the shared queue is
/// drained and discarded rather than forwarded, per the termination
/// sequence's requirement that buffered work not be dispatched after
/// shutdown begins.
fn forwarder_loop<P: Serialize>(
    task_rx: Receiver<TaskEnvelope<P>>,
    sentinel_rx: crossbeam::channel::Receiver<()>,
    shutdown: &ShutdownFlag,
    device_id: u32,
    mut stdin: impl Write,
) {
    loop {
        select! {
            recv(task_rx) -> msg => match msg {
                Ok(envelope) => {
                    if shutdown.load(Ordering::SeqCst) {
                        tracing::debug!(
                            target: LOG_TARGET,
                            device_id,
                            task_id = envelope.task_id,
                            "shutdown in progress; discarding buffered task without dispatching"
                        );
                        continue;
                    }
                    let inbound = WorkerInbound::Task(WireTaskEnvelope {
                        task_id: envelope.task_id,
                        payload: envelope.payload,
                    });
                    if write_line(&mut stdin, &inbound).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(sentinel_rx) -> _ => {
                let _ = write_line(&mut stdin, &WorkerInbound::<P>::Shutdown);
                break;
            },
        }
    }
}

fn write_line<T: Serialize>(out: &mut impl Write, value: &T) -> std::io::Result<()> {
    let line = serde_json::to_string(value)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    writeln!(out, "{line}")?;
    out.flush()
}

fn reader_loop<R: DeserializeOwned>(
    stdout: impl std::io::Read,
    events: Sender<MonitorEvent<R>>,
    device_id: u32,
) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(outcome) = serde_json::from_str::<OutcomeMessage<R>>(&line) else {
            tracing::warn!(
                target: LOG_TARGET,
                device_id,
                "discarding unparseable outcome line from worker"
            );
            continue;
        };
        if events.send(MonitorEvent::Outcome(outcome)).is_err() {
            break;
        }
    }
    let _ = events.send(MonitorEvent::WorkerExited { device_id });
}
