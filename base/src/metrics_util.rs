use crossbeam_channel::{Receiver, Sender};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

/// Name of the env variable which enables metrics recording.
pub const METRICS_ENV_VAR: &str = "TIMELINE_METRICS";

const METRICS_CHANNEL_CAPACITY: usize = 5000;

/// Set once metrics are enabled. Durations are sent to the recorder thread through it.
static RECORDER: OnceLock<Sender<MetricsTask>> = OnceLock::new();

/// Keeps the recorder thread alive. Dropping it makes the thread finish.
#[derive(Debug)]
pub struct MetricsHook {
    sender: Sender<MetricsTask>,
}

impl MetricsHook {
    /// Starts the recorder thread if [`METRICS_ENV_VAR`] is set.
    ///
    /// Returns `None` if metrics are disabled or the hook exists already.
    pub fn init() -> Option<Self> {
        std::env::var(METRICS_ENV_VAR).ok()?;
        let (sender, receiver) = crossbeam_channel::bounded(METRICS_CHANNEL_CAPACITY);
        RECORDER.set(sender.clone()).ok()?;
        let spawn_result = thread::Builder::new()
            .name(String::from("Timeline metrics"))
            .spawn(move || record_until_finished(receiver));
        if let Err(e) = spawn_result {
            tracing::warn!(msg = "Couldn't spawn metrics thread", %e);
            return None;
        }
        tracing::debug!(msg = "Metrics enabled");
        Some(Self { sender })
    }
}

impl Drop for MetricsHook {
    fn drop(&mut self) {
        // The static sender can't be taken back, so the thread needs an explicit signal.
        let _ = self.sender.try_send(MetricsTask::Finish);
    }
}

pub fn metrics_are_enabled() -> bool {
    RECORDER.get().is_some()
}

/// Counts an event, synchronously.
pub fn record_occurrence(id: &'static str) {
    if !metrics_are_enabled() {
        return;
    }
    metrics::counter!(id).increment(1);
}

/// Runs `f` and records how long it took. Just runs `f` if metrics are disabled.
pub fn measure_time<R>(id: &'static str, f: impl FnOnce() -> R) -> R {
    if !metrics_are_enabled() {
        return f();
    }
    let start = Instant::now();
    let result = f();
    record_duration(id, start.elapsed());
    result
}

/// Hands the duration over to the recorder thread. Drops it if the thread doesn't keep up.
pub fn record_duration(id: &'static str, delta: Duration) {
    let Some(sender) = RECORDER.get() else {
        return;
    };
    if sender.try_send(MetricsTask::Histogram { id, delta }).is_err() {
        tracing::debug!(msg = "Metrics channel full, dropping measurement", id);
    }
}

enum MetricsTask {
    Histogram { id: &'static str, delta: Duration },
    Finish,
}

fn record_until_finished(receiver: Receiver<MetricsTask>) {
    for task in receiver {
        match task {
            MetricsTask::Histogram { id, delta } => {
                metrics::histogram!(id).record(delta);
            }
            MetricsTask::Finish => break,
        }
    }
    tracing::debug!(msg = "Metrics recording finished");
}
