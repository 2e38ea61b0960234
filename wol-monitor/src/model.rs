//! Monitored hosts and their sensors.
//!
//! The registry that owns these durably lives outside this crate. What is
//! carried here is a snapshot plus the transient fields the monitor derives:
//! [`Host::status`] and [`Sensor::value`]. Neither is ever serialized.

use std::fmt;

use serde::{Deserialize, Serialize};
use wol_polling::{HostId, PollTarget, SensorId};
use wol_probe::Status;

/// What a sensor measures.
///
/// Stored as its display string; any string other than `"CPU Temp"` is
/// carried as [`SensorKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SensorKind {
    CpuTemperature,
    Other(String),
}

impl SensorKind {
    const CPU_TEMPERATURE: &'static str = "CPU Temp";

    /// Only CPU temperature sensors have a telemetry feed to poll.
    pub fn is_polled(&self) -> bool {
        matches!(self, SensorKind::CpuTemperature)
    }
}

impl From<String> for SensorKind {
    fn from(value: String) -> Self {
        if value == Self::CPU_TEMPERATURE {
            SensorKind::CpuTemperature
        } else {
            SensorKind::Other(value)
        }
    }
}

impl From<SensorKind> for String {
    fn from(kind: SensorKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::CpuTemperature => f.write_str(Self::CPU_TEMPERATURE),
            SensorKind::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    pub kind: SensorKind,
    pub unit: String,
    /// Last reading; live only
    #[serde(skip)]
    pub value: Option<f64>,
}

impl Sensor {
    pub fn new(name: impl Into<String>, kind: SensorKind, unit: impl Into<String>) -> Self {
        Self {
            id: SensorId::new(),
            name: name.into(),
            kind,
            unit: unit.into(),
            value: None,
        }
    }

    /// A polled CPU temperature sensor reporting in Celsius.
    pub fn cpu_temperature(name: impl Into<String>) -> Self {
        Self::new(name, SensorKind::CpuTemperature, "ºC")
    }

    /// Reading formatted to one decimal with its unit, e.g. `"47.5 ºC"`.
    pub fn display_value(&self) -> Option<String> {
        self.value.map(|v| format!("{v:.1} {}", self.unit))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub network_address: Option<String>,
    #[serde(default)]
    pub hardware_address: Option<String>,
    #[serde(default)]
    pub sensors: Vec<Sensor>,
    /// Derived from the latest probe; live only
    #[serde(skip)]
    pub status: Status,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: HostId::new(),
            name: Some(name.into()),
            network_address: None,
            hardware_address: None,
            sensors: Vec::new(),
            status: Status::Unknown,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.network_address = Some(address.into());
        self
    }

    pub fn with_hardware_address(mut self, address: impl Into<String>) -> Self {
        self.hardware_address = Some(address.into());
        self
    }

    pub fn with_sensor(mut self, sensor: Sensor) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Network address to probe and poll, if one is set.
    ///
    /// Blank strings count as absent.
    pub fn address(&self) -> Option<&str> {
        non_blank(self.network_address.as_deref())
    }

    /// Hardware address for wake packets, if one is set.
    pub fn mac(&self) -> Option<&str> {
        non_blank(self.hardware_address.as_deref())
    }

    pub fn sensor(&self, sensor_id: SensorId) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.id == sensor_id)
    }

    pub fn sensor_mut(&mut self, sensor_id: SensorId) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.id == sensor_id)
    }

    /// One-line status for list views.
    ///
    /// Hosts without a network address are never probed, so they show their
    /// hardware address instead, or "No Details".
    pub fn status_text(&self) -> &str {
        match self.address() {
            Some(_) => self.status.label(),
            None => self.mac().unwrap_or("No Details"),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Sensors that should have a polling task, for a registry snapshot.
///
/// Only polled kinds on hosts with a network address qualify.
pub fn required_targets(hosts: &[Host]) -> Vec<PollTarget> {
    hosts
        .iter()
        .filter_map(|host| host.address().map(|address| (host, address)))
        .flat_map(|(host, address)| {
            host.sensors
                .iter()
                .filter(|sensor| sensor.kind.is_polled())
                .map(move |sensor| PollTarget::new(host.id, sensor.id, address))
        })
        .collect()
}
