//! # wol-polling
//!
//! Long-lived telemetry polling, one task per sensor.
//!
//! The owner declares which sensors should be polled, and where, by calling
//! [`PollingOrchestrator::reconcile`] with the full required set whenever it
//! changes. Each task fetches a reading every poll interval and pushes a
//! [`SensorUpdate`] onto a bounded channel without ever blocking on it.
//!
//! ```rust,ignore
//! let (tx, mut rx) = tokio::sync::mpsc::channel(256);
//! let mut orchestrator = PollingOrchestrator::new(PollingConfig::default(), tx);
//!
//! orchestrator.reconcile(vec![PollTarget::new(host_id, sensor_id, "192.168.1.20")]);
//!
//! while let Some(update) = rx.recv().await {
//!     if orchestrator.is_current(&update) {
//!         println!("{} = {}", update.sensor_id, update.value);
//!     }
//! }
//! ```

mod config;
mod error;
mod orchestrator;
mod task;
mod types;

pub use config::PollingConfig;
pub use error::{PollingError, PollingResult};
pub use orchestrator::{PollingOrchestrator, PollingOrchestratorStats, ReconcileReport};
pub use task::{PollingTask, PollingTaskStats};
pub use types::{HostId, PollTarget, SensorId, SensorUpdate};
