//! Error types for the wol-monitor crate.

use wol_polling::HostId;
use wol_wake::WakeError;

use crate::logging::LoggingError;

/// Errors surfaced by [`MonitorHandle`](crate::MonitorHandle) operations.
///
/// Probe and polling faults never appear here; they resolve into a
/// [`Status`](crate::Status) or a missed reading.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No host with this id is in the registry
    #[error("Host {0} not found")]
    HostNotFound(HostId),

    /// A registry position outside the current host list
    #[error("Index {index} out of range for {len} hosts")]
    IndexOutOfRange { index: usize, len: usize },

    /// The host has no hardware address to wake
    #[error("Host {0} has no hardware address")]
    MissingHardwareAddress(HostId),

    /// The coordinator task has exited
    #[error("Coordinator is no longer running")]
    CoordinatorStopped,

    /// Magic packet could not be built or sent
    #[error(transparent)]
    Wake(#[from] WakeError),

    /// Logging could not be initialized
    #[error(transparent)]
    Logging(#[from] LoggingError),
}

/// Convenience type alias for Results using MonitorError.
pub type Result<T> = std::result::Result<T, MonitorError>;
