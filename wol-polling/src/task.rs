//! A single long-lived polling task.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wol_probe::TelemetrySource;

use crate::error::{PollingError, PollingResult};
use crate::types::{HostId, PollTarget, SensorId, SensorUpdate};

/// Handle to one sensor's background polling loop.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollingTask {
    target: PollTarget,
    generation: u64,
    started_at: SystemTime,
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl PollingTask {
    /// Spawn the polling loop for `target` on the current runtime.
    pub(crate) fn start(
        target: PollTarget,
        generation: u64,
        interval: Duration,
        fetch_timeout: Duration,
        source: Arc<dyn TelemetrySource>,
        updates: mpsc::Sender<SensorUpdate>,
        cancel: CancellationToken,
    ) -> Self {
        let task_target = target.clone();
        let task_cancel = cancel.clone();

        let task_handle = tokio::spawn(async move {
            polling_loop(
                task_target,
                generation,
                interval,
                fetch_timeout,
                source,
                updates,
                task_cancel,
            )
            .await;
        });

        Self {
            target,
            generation,
            started_at: SystemTime::now(),
            cancel,
            task_handle: Some(task_handle),
        }
    }

    pub fn sensor_id(&self) -> SensorId {
        self.target.sensor_id
    }

    pub fn host_id(&self) -> HostId {
        self.target.host_id
    }

    pub fn address(&self) -> &str {
        &self.target.address
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Signal the loop to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn shutdown(mut self) -> PollingResult<()> {
        self.cancel.cancel();

        match self.task_handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| PollingError::TaskJoin(e.to_string())),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> PollingTaskStats {
        PollingTaskStats {
            sensor_id: self.target.sensor_id,
            host_id: self.target.host_id,
            address: self.target.address.clone(),
            generation: self.generation,
            started_at: self.started_at,
            is_running: self.is_running(),
        }
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Statistics for a polling task
#[derive(Debug, Clone, PartialEq)]
pub struct PollingTaskStats {
    pub sensor_id: SensorId,
    pub host_id: HostId,
    pub address: String,
    pub generation: u64,
    pub started_at: SystemTime,
    pub is_running: bool,
}

/// Main polling loop
///
/// Cancellation is observed at loop entry, while a fetch is in flight, and
/// before and during the sleep. Each fetch is bounded by `fetch_timeout`
/// whatever the source does internally. Dropping an in-flight fetch closes its
/// connection.
async fn polling_loop(
    target: PollTarget,
    generation: u64,
    interval: Duration,
    fetch_timeout: Duration,
    source: Arc<dyn TelemetrySource>,
    updates: mpsc::Sender<SensorUpdate>,
    cancel: CancellationToken,
) {
    tracing::debug!(
        "Starting polling task for sensor {} at {} (interval: {:?})",
        target.sensor_id,
        target.address,
        interval
    );

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let reading = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            reading = tokio::time::timeout(fetch_timeout, source.fetch_reading(&target.address)) => {
                reading.unwrap_or_else(|_| {
                    tracing::debug!(
                        "Fetch for sensor {} timed out after {:?}",
                        target.sensor_id,
                        fetch_timeout
                    );
                    None
                })
            }
        };

        match reading {
            Some(value) => {
                let update = SensorUpdate {
                    host_id: target.host_id,
                    sensor_id: target.sensor_id,
                    value,
                    generation,
                };

                match updates.try_send(update) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            "Update channel full, dropping reading for sensor {}",
                            target.sensor_id
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(
                            "Update receiver dropped, stopping polling for sensor {}",
                            target.sensor_id
                        );
                        break;
                    }
                }
            }
            None => {
                tracing::warn!(
                    "Failed to fetch temperature for sensor {} from {}",
                    target.sensor_id,
                    target.address
                );
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::debug!("Polling task ended for sensor {}", target.sensor_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wol_probe::testing::ScriptedTelemetry;

    /// Never answers its first fetch, then reads 42.0
    #[derive(Debug, Default)]
    struct StallsOnce {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TelemetrySource for StallsOnce {
        async fn fetch_reading(&self, _address: &str) -> Option<f64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Some(42.0)
        }
    }

    fn target(address: &str) -> PollTarget {
        PollTarget::new(HostId::new(), SensorId::new(), address)
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_readings_in_fetch_order() {
        let source = ScriptedTelemetry::new();
        source.script("10.0.0.1", vec![Some(40.0), Some(41.0), Some(42.0)]);
        let (tx, mut rx) = mpsc::channel(16);

        let task = PollingTask::start(
            target("10.0.0.1"),
            1,
            Duration::from_secs(5),
            Duration::from_secs(3),
            source,
            tx,
            CancellationToken::new(),
        );

        let values: Vec<f64> = vec![
            rx.recv().await.unwrap().value,
            rx.recv().await.unwrap().value,
            rx.recv().await.unwrap().value,
        ];
        assert_eq!(values, vec![40.0, 41.0, 42.0]);

        task.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_emits_nothing_and_continues() {
        let source = ScriptedTelemetry::new();
        source.script("10.0.0.2", vec![None, None, Some(50.0)]);
        let (tx, mut rx) = mpsc::channel(16);

        let task = PollingTask::start(
            target("10.0.0.2"),
            1,
            Duration::from_secs(5),
            Duration::from_secs(3),
            source.clone(),
            tx,
            CancellationToken::new(),
        );

        let update = rx.recv().await.unwrap();
        assert_eq!(update.value, 50.0);
        assert_eq!(source.fetch_count("10.0.0.2"), 3);

        task.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_exits_promptly() {
        let source = ScriptedTelemetry::new();
        source.script("10.0.0.3", vec![Some(30.0)]);
        let (tx, mut rx) = mpsc::channel(16);

        let task = PollingTask::start(
            target("10.0.0.3"),
            1,
            Duration::from_secs(60),
            Duration::from_secs(3),
            source,
            tx,
            CancellationToken::new(),
        );
        rx.recv().await.unwrap();

        let started = tokio::time::Instant::now();
        task.shutdown().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_channel_drops_instead_of_blocking() {
        let source = ScriptedTelemetry::new();
        source.script("10.0.0.4", vec![Some(1.0)]);
        let (tx, mut rx) = mpsc::channel(1);

        let task = PollingTask::start(
            target("10.0.0.4"),
            1,
            Duration::from_secs(1),
            Duration::from_secs(3),
            source.clone(),
            tx,
            CancellationToken::new(),
        );

        // Nobody drains for several cycles; the loop must keep going
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(source.fetch_count("10.0.0.4") >= 5);
        assert!(task.is_running());

        assert!(rx.recv().await.is_some());
        task.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_stops_task() {
        let source = ScriptedTelemetry::new();
        source.script("10.0.0.5", vec![Some(1.0)]);
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        let task = PollingTask::start(
            target("10.0.0.5"),
            1,
            Duration::from_secs(1),
            Duration::from_secs(3),
            source,
            tx,
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_times_out_and_polling_resumes() {
        let source = Arc::new(StallsOnce::default());
        let (tx, mut rx) = mpsc::channel(16);

        let task = PollingTask::start(
            target("10.0.0.6"),
            1,
            Duration::from_secs(5),
            Duration::from_secs(3),
            source.clone(),
            tx,
            CancellationToken::new(),
        );

        let started = tokio::time::Instant::now();
        let update = rx.recv().await.unwrap();
        assert_eq!(update.value, 42.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        // First attempt abandoned at 3s, second after the 5s sleep
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(8), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(9), "{elapsed:?}");

        task.shutdown().await.unwrap();
    }
}
