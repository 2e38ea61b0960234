//! The coordinator task
//!
//! One Tokio task owns the registry snapshot, every host's status and the
//! polling orchestrator. Probes and polling tasks report back over channels
//! and [`MonitorHandle`] talks to it with commands, so nothing outside this
//! task ever mutates that state.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use wol_polling::{HostId, PollingOrchestrator, ReconcileReport, SensorUpdate};
use wol_probe::{Connector, Status, StatusProbe, TelemetryFetcher, TelemetrySource};
use wol_wake::MagicPacketSender;

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::handle::{MonitorEvent, MonitorHandle};
use crate::model::{required_targets, Host};

/// Requests from a [`MonitorHandle`] to the coordinator task
#[derive(Debug)]
pub(crate) enum Command {
    RefreshAll {
        done: oneshot::Sender<()>,
    },
    RefreshOne {
        host_id: HostId,
        reply: oneshot::Sender<Result<Status>>,
    },
    /// Install a snapshot and reconcile polling right away
    ReconcilePolling {
        hosts: Vec<Host>,
        reply: oneshot::Sender<ReconcileReport>,
    },
    /// Install a snapshot; polling follows after the debounce window
    ReplaceRegistry {
        hosts: Vec<Host>,
        done: oneshot::Sender<()>,
    },
    AddHost {
        host: Host,
        done: oneshot::Sender<()>,
    },
    RemoveHost {
        host_id: HostId,
        reply: oneshot::Sender<Result<Host>>,
    },
    UpdateHost {
        host: Host,
        reply: oneshot::Sender<Result<()>>,
    },
    MoveHost {
        from: usize,
        to: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Host>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Builder for the coordinator task.
///
/// ```rust,ignore
/// let monitor = Coordinator::new(MonitorConfig::default(), hosts).spawn()?;
/// let mut events = monitor.subscribe();
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// ```
pub struct Coordinator {
    config: MonitorConfig,
    hosts: Vec<Host>,
    connector: Option<Arc<dyn Connector>>,
    telemetry: Option<Arc<dyn TelemetrySource>>,
}

impl Coordinator {
    pub fn new(config: MonitorConfig, hosts: Vec<Host>) -> Self {
        Self {
            config,
            hosts,
            connector: None,
            telemetry: None,
        }
    }

    /// Replace the TCP connector used by status probes.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replace the TCP telemetry fetcher used by polling tasks.
    pub fn with_telemetry_source(mut self, source: Arc<dyn TelemetrySource>) -> Self {
        self.telemetry = Some(source);
        self
    }

    /// Start the coordinator on the current Tokio runtime.
    ///
    /// Polling for the initial hosts starts immediately and the first status
    /// sweep runs as soon as the task is scheduled.
    pub fn spawn(self) -> Result<MonitorHandle> {
        self.config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer);
        let (event_tx, _) = broadcast::channel(self.config.event_buffer);
        let (update_tx, update_rx) = mpsc::channel(self.config.update_buffer);

        let probe = match self.connector {
            Some(connector) => StatusProbe::with_connector(self.config.probe.clone(), connector),
            None => StatusProbe::new(self.config.probe.clone()),
        };
        let source: Arc<dyn TelemetrySource> = match self.telemetry {
            Some(source) => source,
            None => Arc::new(TelemetryFetcher::new(self.config.polling.telemetry.clone())),
        };
        let orchestrator =
            PollingOrchestrator::with_source(self.config.polling.clone(), source, update_tx);
        let waker = MagicPacketSender::new(self.config.wake);

        let mut worker = Worker {
            config: self.config,
            hosts: Vec::new(),
            probe,
            orchestrator,
            events: event_tx.clone(),
            probes: JoinSet::new(),
            probe_batches: HashMap::new(),
            batches: HashMap::new(),
            next_batch: 0,
            next_probe: 0,
            applied_probe: HashMap::new(),
            reconcile_at: None,
        };

        // The startup sweep covers every addressed host
        let _ = worker.install_registry(self.hosts);
        worker.reconcile_now();

        tokio::spawn(worker.run(command_rx, update_rx));

        Ok(MonitorHandle::new(command_tx, event_tx, waker))
    }
}

/// Result of one status probe, tagged with what launched it
struct ProbeReport {
    seq: u64,
    batch: Option<u64>,
    host_id: HostId,
    address: String,
    status: Status,
    reply: Option<oneshot::Sender<Result<Status>>>,
}

/// An in-flight `refresh_all` sweep
struct Batch {
    remaining: usize,
    waiters: Vec<oneshot::Sender<()>>,
}

struct Worker {
    config: MonitorConfig,
    hosts: Vec<Host>,
    probe: StatusProbe,
    orchestrator: PollingOrchestrator,
    events: broadcast::Sender<MonitorEvent>,
    probes: JoinSet<ProbeReport>,
    /// Batch of every in-flight probe task, so a failed task still counts
    probe_batches: HashMap<task::Id, Option<u64>>,
    batches: HashMap<u64, Batch>,
    next_batch: u64,
    next_probe: u64,
    /// Sequence number of the newest probe applied per host
    applied_probe: HashMap<HostId, u64>,
    reconcile_at: Option<Instant>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut updates: mpsc::Receiver<SensorUpdate>,
    ) {
        let mut refresh = tokio::time::interval(self.config.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Coordinator started with {} hosts", self.hosts.len());

        loop {
            let reconcile_at = self.reconcile_at;
            let debounce = async move {
                match reconcile_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("All monitor handles dropped, shutting down");
                        self.shutdown().await;
                        break;
                    };
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }

                Some(update) = updates.recv() => self.apply_sensor_update(update),

                Some(joined) = self.probes.join_next_with_id(), if !self.probes.is_empty() => {
                    self.handle_probe(joined);
                }

                _ = debounce => {
                    self.reconcile_at = None;
                    self.reconcile_now();
                }

                _ = refresh.tick() => self.start_refresh(None),
            }
        }

        tracing::info!("Coordinator stopped");
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::RefreshAll { done } => self.start_refresh(Some(done)),
            Command::RefreshOne { host_id, reply } => self.refresh_one(host_id, reply),
            Command::ReconcilePolling { hosts, reply } => {
                self.install_and_probe(hosts);
                self.reconcile_at = None;
                let _ = reply.send(self.reconcile_now());
            }
            Command::ReplaceRegistry { hosts, done } => {
                self.install_and_probe(hosts);
                self.schedule_reconcile();
                let _ = done.send(());
            }
            Command::AddHost { host, done } => {
                let mut hosts = self.hosts.clone();
                match hosts.iter().position(|h| h.id == host.id) {
                    Some(index) => hosts[index] = host,
                    None => hosts.push(host),
                }
                self.install_and_probe(hosts);
                self.schedule_reconcile();
                let _ = done.send(());
            }
            Command::RemoveHost { host_id, reply } => {
                let result = match self.position(host_id) {
                    Some(index) => {
                        let mut hosts = self.hosts.clone();
                        let removed = hosts.remove(index);
                        self.install_and_probe(hosts);
                        self.schedule_reconcile();
                        Ok(removed)
                    }
                    None => Err(MonitorError::HostNotFound(host_id)),
                };
                let _ = reply.send(result);
            }
            Command::UpdateHost { host, reply } => {
                let result = match self.position(host.id) {
                    Some(index) => {
                        let mut hosts = self.hosts.clone();
                        hosts[index] = host;
                        self.install_and_probe(hosts);
                        self.schedule_reconcile();
                        Ok(())
                    }
                    None => Err(MonitorError::HostNotFound(host.id)),
                };
                let _ = reply.send(result);
            }
            Command::MoveHost { from, to, reply } => {
                let len = self.hosts.len();
                let result = if from >= len {
                    Err(MonitorError::IndexOutOfRange { index: from, len })
                } else if to >= len {
                    Err(MonitorError::IndexOutOfRange { index: to, len })
                } else {
                    let host = self.hosts.remove(from);
                    self.hosts.insert(to, host);
                    self.schedule_reconcile();
                    Ok(())
                };
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.hosts.clone());
            }
            Command::Shutdown { done } => {
                self.shutdown().await;
                let _ = done.send(());
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    fn position(&self, host_id: HostId) -> Option<usize> {
        self.hosts.iter().position(|h| h.id == host_id)
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Replace the registry, carrying live state over for unchanged hosts.
    ///
    /// Returns the hosts that are new or whose address changed, which have
    /// no valid status yet.
    fn install_registry(&mut self, incoming: Vec<Host>) -> Vec<(HostId, String)> {
        let mut previous: HashMap<HostId, Host> = std::mem::take(&mut self.hosts)
            .into_iter()
            .map(|h| (h.id, h))
            .collect();

        let mut seen = HashSet::new();
        let mut installed = Vec::with_capacity(incoming.len());
        let mut unprobed = Vec::new();
        let mut changed = Vec::new();

        for mut host in incoming {
            if !seen.insert(host.id) {
                tracing::warn!("Host {} listed twice, ignoring the duplicate", host.id);
                continue;
            }

            let old = previous.remove(&host.id);
            let old_status = old.as_ref().map_or(Status::Unknown, |h| h.status);

            match old {
                Some(old) if old.address() == host.address() => {
                    host.status = old.status;
                    for sensor in &mut host.sensors {
                        if let Some(value) = old.sensor(sensor.id).and_then(|s| s.value) {
                            sensor.value = Some(value);
                        }
                    }
                }
                _ => {
                    host.status = Status::Unknown;
                    if let Some(address) = host.address() {
                        unprobed.push((host.id, address.to_string()));
                    }
                }
            }

            if host.status != old_status {
                changed.push((host.id, host.status));
            }
            installed.push(host);
        }

        self.applied_probe.retain(|id, _| seen.contains(id));
        self.hosts = installed;

        for (host_id, status) in changed {
            self.emit(MonitorEvent::StatusChanged { host_id, status });
        }

        unprobed
    }

    fn install_and_probe(&mut self, hosts: Vec<Host>) {
        for (host_id, address) in self.install_registry(hosts) {
            self.spawn_probe(host_id, address, None, None);
        }
    }

    fn schedule_reconcile(&mut self) {
        self.reconcile_at = Some(Instant::now() + self.config.reconcile_debounce);
    }

    fn reconcile_now(&mut self) -> ReconcileReport {
        self.orchestrator.reconcile(required_targets(&self.hosts))
    }

    fn spawn_probe(
        &mut self,
        host_id: HostId,
        address: String,
        batch: Option<u64>,
        reply: Option<oneshot::Sender<Result<Status>>>,
    ) {
        self.next_probe += 1;
        let seq = self.next_probe;
        let probe = self.probe.clone();

        let handle = self.probes.spawn(async move {
            let status = probe.determine(&address).await;
            ProbeReport {
                seq,
                batch,
                host_id,
                address,
                status,
                reply,
            }
        });
        self.probe_batches.insert(handle.id(), batch);
    }

    fn start_refresh(&mut self, done: Option<oneshot::Sender<()>>) {
        let targets: Vec<(HostId, String)> = self
            .hosts
            .iter()
            .filter_map(|h| h.address().map(|a| (h.id, a.to_string())))
            .collect();

        if targets.is_empty() {
            if let Some(done) = done {
                let _ = done.send(());
            }
            return;
        }

        self.next_batch += 1;
        let batch = self.next_batch;
        tracing::debug!("Refreshing status of {} hosts", targets.len());

        self.batches.insert(
            batch,
            Batch {
                remaining: targets.len(),
                waiters: done.into_iter().collect(),
            },
        );

        for (host_id, address) in targets {
            self.spawn_probe(host_id, address, Some(batch), None);
        }
    }

    fn refresh_one(&mut self, host_id: HostId, reply: oneshot::Sender<Result<Status>>) {
        let address = match self.position(host_id) {
            Some(index) => self.hosts[index].address().map(str::to_string),
            None => {
                let _ = reply.send(Err(MonitorError::HostNotFound(host_id)));
                return;
            }
        };

        match address {
            Some(address) => self.spawn_probe(host_id, address, None, Some(reply)),
            None => {
                let _ = reply.send(Ok(Status::Unknown));
            }
        }
    }

    fn handle_probe(&mut self, joined: std::result::Result<(task::Id, ProbeReport), JoinError>) {
        let report = match joined {
            Ok((id, report)) => {
                self.probe_batches.remove(&id);
                report
            }
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::error!("Status probe task failed: {}", e);
                }
                if let Some(Some(batch)) = self.probe_batches.remove(&e.id()) {
                    self.finish_batch_member(batch);
                }
                return;
            }
        };

        let ProbeReport {
            seq,
            batch,
            host_id,
            address,
            status,
            reply,
        } = report;

        let current = self.apply_status(host_id, &address, seq, status);

        if let Some(reply) = reply {
            let _ = reply.send(current.ok_or(MonitorError::HostNotFound(host_id)));
        }

        if let Some(batch) = batch {
            self.finish_batch_member(batch);
        }
    }

    /// Apply a probe result if it still describes the host. Returns the
    /// host's status afterwards, or `None` if the host is gone.
    fn apply_status(
        &mut self,
        host_id: HostId,
        address: &str,
        seq: u64,
        status: Status,
    ) -> Option<Status> {
        let index = self.position(host_id)?;

        if self.hosts[index].address() != Some(address) {
            tracing::debug!(
                "Discarding probe of {} for host {}: address changed",
                address,
                host_id
            );
            return Some(self.hosts[index].status);
        }

        let latest = self.applied_probe.entry(host_id).or_insert(0);
        if seq < *latest {
            return Some(self.hosts[index].status);
        }
        *latest = seq;

        let host = &mut self.hosts[index];
        if host.status != status {
            tracing::info!("Host {} ({}) is now {}", host_id, address, status);
            host.status = status;
            self.emit(MonitorEvent::StatusChanged { host_id, status });
        }

        Some(status)
    }

    fn finish_batch_member(&mut self, batch: u64) {
        let complete = match self.batches.get_mut(&batch) {
            Some(entry) => {
                entry.remaining = entry.remaining.saturating_sub(1);
                entry.remaining == 0
            }
            None => false,
        };

        if complete {
            if let Some(entry) = self.batches.remove(&batch) {
                for waiter in entry.waiters {
                    let _ = waiter.send(());
                }
            }
        }
    }

    fn apply_sensor_update(&mut self, update: SensorUpdate) {
        if !self.orchestrator.is_current(&update) {
            tracing::debug!("Dropping stale reading for sensor {}", update.sensor_id);
            return;
        }

        let bound = self.orchestrator.bound_address(update.sensor_id);
        let Some(host) = self.hosts.iter_mut().find(|h| h.id == update.host_id) else {
            return;
        };
        // Readings taken at an address the host no longer has are not its own
        if host.address() != bound {
            return;
        }
        let Some(sensor) = host.sensor_mut(update.sensor_id) else {
            return;
        };

        sensor.value = Some(update.value);
        let _ = self.events.send(MonitorEvent::SensorValue {
            host_id: update.host_id,
            sensor_id: update.sensor_id,
            value: update.value,
        });
    }

    async fn shutdown(&mut self) {
        self.probes.shutdown().await;
        self.batches.clear();
        self.probe_batches.clear();
        self.reconcile_at = None;

        if let Err(e) = self.orchestrator.shutdown_all().await {
            tracing::warn!("Failed to stop polling tasks: {}", e);
        }
    }
}
