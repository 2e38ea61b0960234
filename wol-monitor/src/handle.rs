//! Client side of the coordinator.

use tokio::sync::{broadcast, mpsc, oneshot};
use wol_polling::{HostId, ReconcileReport, SensorId};
use wol_probe::Status;
use wol_wake::MagicPacketSender;

use crate::coordinator::Command;
use crate::error::{MonitorError, Result};
use crate::model::Host;

/// Something the UI layer should redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A host's status differs from what was last reported
    StatusChanged { host_id: HostId, status: Status },
    /// A sensor produced a new reading
    SensorValue {
        host_id: HostId,
        sensor_id: SensorId,
        value: f64,
    },
}

/// Cloneable handle to a running [`Coordinator`](crate::Coordinator).
///
/// Every async method is a request to the coordinator task and fails with
/// [`MonitorError::CoordinatorStopped`] once it has exited. Wake packets
/// bypass the coordinator entirely.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<MonitorEvent>,
    waker: MagicPacketSender,
}

impl MonitorHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        events: broadcast::Sender<MonitorEvent>,
        waker: MagicPacketSender,
    ) -> Self {
        Self {
            commands,
            events,
            waker,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| MonitorError::CoordinatorStopped)?;
        rx.await.map_err(|_| MonitorError::CoordinatorStopped)
    }

    /// Probe every addressed host concurrently; resolves when all have
    /// reported. Results are applied as each probe finishes.
    pub async fn refresh_all(&self) -> Result<()> {
        self.request(|done| Command::RefreshAll { done }).await
    }

    /// Probe one host and return its resulting status.
    ///
    /// A host without a network address is not probed and reports
    /// [`Status::Unknown`].
    pub async fn refresh_one(&self, host_id: HostId) -> Result<Status> {
        self.request(|reply| Command::RefreshOne { host_id, reply })
            .await?
    }

    /// Install `hosts` as the registry and sync polling tasks immediately.
    pub async fn reconcile_polling(&self, hosts: Vec<Host>) -> Result<ReconcileReport> {
        self.request(|reply| Command::ReconcilePolling { hosts, reply })
            .await
    }

    /// Install `hosts` as the registry. Polling is synced once changes
    /// stop arriving for the debounce window.
    pub async fn replace_registry(&self, hosts: Vec<Host>) -> Result<()> {
        self.request(|done| Command::ReplaceRegistry { hosts, done })
            .await
    }

    /// Append a host, or replace the host with the same id.
    pub async fn add_host(&self, host: Host) -> Result<()> {
        self.request(|done| Command::AddHost { host, done }).await
    }

    pub async fn remove_host(&self, host_id: HostId) -> Result<Host> {
        self.request(|reply| Command::RemoveHost { host_id, reply })
            .await?
    }

    /// Replace the host with `host.id`. Changing its address resets its
    /// status and probes it again.
    pub async fn update_host(&self, host: Host) -> Result<()> {
        self.request(|reply| Command::UpdateHost { host, reply })
            .await?
    }

    /// Move the host at position `from` to position `to`.
    pub async fn move_host(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| Command::MoveHost { from, to, reply })
            .await?
    }

    /// Current registry with live status and sensor values applied.
    pub async fn snapshot(&self) -> Result<Vec<Host>> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn host(&self, host_id: HostId) -> Result<Host> {
        self.snapshot()
            .await?
            .into_iter()
            .find(|h| h.id == host_id)
            .ok_or(MonitorError::HostNotFound(host_id))
    }

    /// Events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Send a magic packet for `hardware_address` to the configured target.
    ///
    /// Success only means the datagram was handed to the network stack.
    pub fn send_wake(&self, hardware_address: &str) -> Result<()> {
        self.waker.send(hardware_address)?;
        Ok(())
    }

    /// Wake a registered host by its hardware address.
    pub async fn wake_host(&self, host_id: HostId) -> Result<()> {
        let host = self.host(host_id).await?;
        let mac = host
            .mac()
            .ok_or(MonitorError::MissingHardwareAddress(host_id))?;
        self.send_wake(mac)
    }

    /// Stop the sweep timer, abort in-flight probes and stop every
    /// polling task. Resolves once all of that has finished.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|done| Command::Shutdown { done }).await
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}
