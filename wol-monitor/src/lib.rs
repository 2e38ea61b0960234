//! # wol-monitor
//!
//! Keeps a registry of LAN hosts up to date: periodic status sweeps, live
//! CPU temperature polling, and wake-on-LAN.
//!
//! A [`Coordinator`] task owns all live state. Applications talk to it
//! through a [`MonitorHandle`] and redraw from the [`MonitorEvent`] stream.
//!
//! ```rust,ignore
//! use wol_monitor::{Coordinator, Host, MonitorConfig, Sensor};
//!
//! wol_monitor::logging::init_logging_from_env()?;
//!
//! let hosts = vec![Host::new("nas")
//!     .with_address("192.168.1.20")
//!     .with_hardware_address("AA:BB:CC:DD:EE:FF")
//!     .with_sensor(Sensor::cpu_temperature("CPU"))];
//!
//! let monitor = Coordinator::new(MonitorConfig::default(), hosts).spawn()?;
//! let mut events = monitor.subscribe();
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

mod config;
mod coordinator;
mod error;
mod handle;
pub mod logging;
mod model;

pub use config::MonitorConfig;
pub use coordinator::Coordinator;
pub use error::{MonitorError, Result};
pub use handle::{MonitorEvent, MonitorHandle};
pub use model::{required_targets, Host, Sensor, SensorKind};

// Types callers need from the lower layers
pub use wol_polling::{HostId, ReconcileReport, SensorId};
pub use wol_probe::Status;
pub use wol_wake::{WakeError, WakeTarget};
