//! Error types for the wol-probe crate.
//!
//! These never escape [`StatusProbe::determine`](crate::StatusProbe::determine)
//! or [`TelemetryFetcher::fetch_reading`](crate::TelemetryFetcher::fetch_reading);
//! both resolve every fault into a terminal result. They are public so callers
//! that want the detail can use [`TelemetryFetcher::fetch`](crate::TelemetryFetcher::fetch).

use std::time::Duration;

/// Errors from a single probe or telemetry attempt.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The network address was empty or unusable
    #[error("Invalid network address: {0}")]
    AddressInvalid(String),

    /// The TCP connection could not be established
    #[error("Connection to {address}:{port} failed: {source}")]
    ConnectFailed {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The connection was established but reading the response failed
    #[error("Read from {address} failed: {source}")]
    ReadFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The telemetry response did not contain a reading
    #[error("Failed to parse telemetry response: {0}")]
    ParseFailed(String),

    /// The attempt did not complete in time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience type alias for Results using ProbeError.
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_display() {
        let error = ProbeError::AddressInvalid("".to_string());
        assert_eq!(error.to_string(), "Invalid network address: ");

        let error = ProbeError::ConnectFailed {
            address: "192.168.1.10".to_string(),
            port: 51201,
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert!(error.to_string().contains("192.168.1.10:51201"));

        let error = ProbeError::ParseFailed("hello".to_string());
        assert_eq!(error.to_string(), "Failed to parse telemetry response: hello");

        let error = ProbeError::Timeout(Duration::from_secs(3));
        assert_eq!(error.to_string(), "Timed out after 3s");
    }
}
