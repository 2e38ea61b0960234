//! Identifiers and messages shared between the orchestrator and its owner.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Stable identity of a monitored host
    HostId
);

uuid_id!(
    /// Stable identity of a sensor; unique across all hosts
    SensorId
);

/// One entry of the required-sensor set handed to `reconcile`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollTarget {
    pub host_id: HostId,
    pub sensor_id: SensorId,
    pub address: String,
}

impl PollTarget {
    pub fn new(host_id: HostId, sensor_id: SensorId, address: impl Into<String>) -> Self {
        Self {
            host_id,
            sensor_id,
            address: address.into(),
        }
    }
}

/// A reading produced by one successful fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    pub host_id: HostId,
    pub sensor_id: SensorId,
    pub value: f64,
    /// Which incarnation of the sensor's task produced this update
    pub(crate) generation: u64,
}

impl SensorUpdate {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
