//! Polling task orchestration
//!
//! [`PollingOrchestrator`] keeps exactly one [`PollingTask`] per required
//! sensor. Callers declare the full desired set with
//! [`reconcile`](PollingOrchestrator::reconcile); the orchestrator starts what
//! is missing, cancels what is no longer wanted, and restarts tasks whose
//! bound address changed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wol_probe::{TelemetryFetcher, TelemetrySource};

use crate::config::PollingConfig;
use crate::error::PollingResult;
use crate::task::{PollingTask, PollingTaskStats};
use crate::types::{PollTarget, SensorId, SensorUpdate};

/// What a single `reconcile` call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sensors that had no task and now have one
    pub started: Vec<SensorId>,
    /// Sensors whose task was cancelled and removed
    pub stopped: Vec<SensorId>,
    /// Sensors whose task was replaced because its target changed
    pub restarted: Vec<SensorId>,
    /// Required sensors not started because the task limit was reached
    pub skipped: Vec<SensorId>,
}

impl ReconcileReport {
    /// True if the running task set was left untouched.
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty() && self.restarted.is_empty()
    }
}

/// Owns the set of per-sensor polling tasks.
///
/// Not shared: the owner calls `reconcile` from its own task, so the task map
/// needs no lock. Methods that spawn must run inside a Tokio runtime.
pub struct PollingOrchestrator {
    tasks: HashMap<SensorId, PollingTask>,
    source: Arc<dyn TelemetrySource>,
    updates: mpsc::Sender<SensorUpdate>,
    config: PollingConfig,
    root_cancel: CancellationToken,
    next_generation: u64,
}

impl fmt::Debug for PollingOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingOrchestrator")
            .field("tasks", &self.tasks.len())
            .field("config", &self.config)
            .finish()
    }
}

impl PollingOrchestrator {
    /// Create an orchestrator that fetches over TCP per `config.telemetry`.
    pub fn new(config: PollingConfig, updates: mpsc::Sender<SensorUpdate>) -> Self {
        let source = Arc::new(TelemetryFetcher::new(config.telemetry.clone()));
        Self::with_source(config, source, updates)
    }

    /// Create an orchestrator with a custom telemetry source.
    pub fn with_source(
        config: PollingConfig,
        source: Arc<dyn TelemetrySource>,
        updates: mpsc::Sender<SensorUpdate>,
    ) -> Self {
        Self {
            tasks: HashMap::new(),
            source,
            updates,
            config,
            root_cancel: CancellationToken::new(),
            next_generation: 0,
        }
    }

    /// Bring the running tasks in line with `required`.
    ///
    /// Idempotent: calling again with the same set changes nothing. If the
    /// same sensor appears more than once, the first entry wins.
    pub fn reconcile<I>(&mut self, required: I) -> ReconcileReport
    where
        I: IntoIterator<Item = PollTarget>,
    {
        let mut desired: HashMap<SensorId, PollTarget> = HashMap::new();
        for target in required {
            match desired.entry(target.sensor_id) {
                Entry::Vacant(slot) => {
                    slot.insert(target);
                }
                Entry::Occupied(existing) => {
                    if existing.get() != &target {
                        tracing::warn!(
                            "Sensor {} required twice with different targets, keeping {}",
                            target.sensor_id,
                            existing.get().address
                        );
                    }
                }
            }
        }

        let mut report = ReconcileReport::default();

        // A task whose update receiver went away has exited on its own.
        // Forget it so a still-required sensor gets a fresh task.
        let exited: Vec<SensorId> = self
            .tasks
            .iter()
            .filter(|(_, task)| !task.is_running())
            .map(|(id, _)| *id)
            .collect();
        for sensor_id in exited {
            if let Some(task) = self.tasks.remove(&sensor_id) {
                tracing::debug!(
                    "Polling task for sensor {} at {} had exited, removing",
                    sensor_id,
                    task.address()
                );
                if !desired.contains_key(&sensor_id) {
                    report.stopped.push(sensor_id);
                }
            }
        }

        // running - required
        let stale: Vec<SensorId> = self
            .tasks
            .keys()
            .filter(|id| !desired.contains_key(id))
            .copied()
            .collect();
        for sensor_id in stale {
            if self.stop_polling(sensor_id) {
                report.stopped.push(sensor_id);
            }
        }

        // required - running, plus retargeted sensors
        for (sensor_id, target) in desired {
            match self.tasks.get(&sensor_id) {
                Some(task) if task.target() == &target => {}
                Some(task) => {
                    tracing::info!(
                        "Sensor {} moved from {} to {}, restarting",
                        sensor_id,
                        task.address(),
                        target.address
                    );
                    self.stop_polling(sensor_id);
                    self.spawn(target);
                    report.restarted.push(sensor_id);
                }
                None => {
                    if self.tasks.len() >= self.config.max_concurrent_tasks {
                        tracing::warn!(
                            "Polling task limit ({}) reached, not polling sensor {}",
                            self.config.max_concurrent_tasks,
                            sensor_id
                        );
                        report.skipped.push(sensor_id);
                        continue;
                    }
                    self.spawn(target);
                    report.started.push(sensor_id);
                }
            }
        }

        report.started.sort();
        report.stopped.sort();
        report.restarted.sort();
        report.skipped.sort();

        if !report.is_noop() {
            tracing::debug!(
                "Reconciled polling: {} started, {} stopped, {} restarted, {} running",
                report.started.len(),
                report.stopped.len(),
                report.restarted.len(),
                self.tasks.len()
            );
        }

        report
    }

    fn spawn(&mut self, target: PollTarget) {
        self.next_generation += 1;
        let sensor_id = target.sensor_id;
        let task = PollingTask::start(
            target,
            self.next_generation,
            self.config.poll_interval,
            self.config.telemetry.timeout,
            Arc::clone(&self.source),
            self.updates.clone(),
            self.root_cancel.child_token(),
        );
        self.tasks.insert(sensor_id, task);
    }

    /// Cancel and forget the task for `sensor_id`. Returns whether one existed.
    ///
    /// Does not wait for the task to exit; updates it already queued are
    /// rejected by [`is_current`](Self::is_current).
    pub fn stop_polling(&mut self, sensor_id: SensorId) -> bool {
        match self.tasks.remove(&sensor_id) {
            Some(task) => {
                task.cancel();
                tracing::debug!("Stopped polling for sensor {} at {}", sensor_id, task.address());
                true
            }
            None => false,
        }
    }

    /// Whether `update` came from the task currently registered for its sensor.
    ///
    /// Readings from a cancelled or replaced task may still sit in the
    /// channel; owners should drop updates for which this returns false.
    pub fn is_current(&self, update: &SensorUpdate) -> bool {
        self.tasks
            .get(&update.sensor_id)
            .map_or(false, |task| task.generation() == update.generation)
    }

    /// Whether `sensor_id` has a task that is still running.
    pub fn is_polling(&self, sensor_id: SensorId) -> bool {
        self.tasks
            .get(&sensor_id)
            .map_or(false, PollingTask::is_running)
    }

    pub fn bound_address(&self, sensor_id: SensorId) -> Option<&str> {
        self.tasks.get(&sensor_id).map(|task| task.address())
    }

    /// Sensors with a running task, sorted.
    pub fn running_sensors(&self) -> Vec<SensorId> {
        let mut ids: Vec<SensorId> = self.tasks.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Get statistics for all active polling tasks
    pub fn stats(&self) -> PollingOrchestratorStats {
        let mut task_stats: Vec<PollingTaskStats> =
            self.tasks.values().map(PollingTask::stats).collect();
        task_stats.sort_by_key(|s| s.sensor_id);

        PollingOrchestratorStats {
            total_active_tasks: self.tasks.len(),
            max_concurrent_tasks: self.config.max_concurrent_tasks,
            poll_interval: self.config.poll_interval,
            task_stats,
        }
    }

    /// Cancel every task and wait for each to exit.
    pub async fn shutdown_all(&mut self) -> PollingResult<()> {
        self.root_cancel.cancel();

        for (sensor_id, task) in self.tasks.drain() {
            match task.shutdown().await {
                Ok(()) => tracing::debug!("Shutdown polling task {}", sensor_id),
                Err(e) => tracing::warn!("Failed to shutdown polling task {}: {}", sensor_id, e),
            }
        }

        // Later reconciles get a fresh root
        self.root_cancel = CancellationToken::new();
        Ok(())
    }
}

impl Drop for PollingOrchestrator {
    fn drop(&mut self) {
        self.root_cancel.cancel();
    }
}

/// Statistics for the polling orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct PollingOrchestratorStats {
    pub total_active_tasks: usize,
    pub max_concurrent_tasks: usize,
    pub poll_interval: Duration,
    pub task_stats: Vec<PollingTaskStats>,
}

impl fmt::Display for PollingOrchestratorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Polling Orchestrator Stats:")?;
        writeln!(
            f,
            "  Active tasks: {}/{}",
            self.total_active_tasks, self.max_concurrent_tasks
        )?;
        writeln!(f, "  Poll interval: {:?}", self.poll_interval)?;

        if !self.task_stats.is_empty() {
            writeln!(f, "  Task details:")?;
            for stat in &self.task_stats {
                writeln!(
                    f,
                    "    {}: {} (host {}, generation {}, running: {})",
                    stat.sensor_id, stat.address, stat.host_id, stat.generation, stat.is_running
                )?;
            }
        }

        Ok(())
    }
}
