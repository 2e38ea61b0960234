//! Configuration for status probes and telemetry fetches.

use std::time::Duration;

use crate::error::ProbeError;

/// Port the monitoring helper service listens on.
pub const DEFAULT_SERVICE_PORT: u16 = 51201;

/// Port used as a general "is the machine up at all" signal.
pub const DEFAULT_REACHABILITY_PORT: u16 = 22;

/// Configuration for [`StatusProbe`](crate::StatusProbe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Port of the monitored service (stage 1)
    /// Default: 51201
    pub service_port: u16,

    /// Port used for the general reachability check (stage 2)
    /// Default: 22
    pub reachability_port: u16,

    /// Connect timeout for the service port (T1)
    /// Default: 3 seconds
    pub service_timeout: Duration,

    /// Connect timeout for the reachability port (T2)
    /// Default: 4 seconds
    pub reachability_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            service_port: DEFAULT_SERVICE_PORT,
            reachability_port: DEFAULT_REACHABILITY_PORT,
            service_timeout: Duration::from_secs(3),
            reachability_timeout: Duration::from_secs(4),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on how long a single `determine` call can take.
    pub fn max_duration(&self) -> Duration {
        self.service_timeout + self.reachability_timeout
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.service_port == 0 || self.reachability_port == 0 {
            return Err(ProbeError::Configuration(
                "Probe ports must be non-zero".to_string(),
            ));
        }

        if self.service_timeout.is_zero() || self.reachability_timeout.is_zero() {
            return Err(ProbeError::Configuration(
                "Probe timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_ports(mut self, service: u16, reachability: u16) -> Self {
        self.service_port = service;
        self.reachability_port = reachability;
        self
    }

    pub fn with_timeouts(mut self, service: Duration, reachability: Duration) -> Self {
        self.service_timeout = service;
        self.reachability_timeout = reachability;
        self
    }
}

/// Configuration for [`TelemetryFetcher`](crate::TelemetryFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Port serving the plaintext telemetry response
    /// Default: 51201
    pub port: u16,

    /// Budget for connect + read of one fetch
    /// Default: 3 seconds
    pub timeout: Duration,

    /// Stop reading after this many bytes
    /// Default: 4096
    pub max_response_bytes: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVICE_PORT,
            timeout: Duration::from_secs(3),
            max_response_bytes: 4096,
        }
    }
}

impl TelemetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.port == 0 {
            return Err(ProbeError::Configuration(
                "Telemetry port must be non-zero".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ProbeError::Configuration(
                "Telemetry timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_response_bytes == 0 {
            return Err(ProbeError::Configuration(
                "Max response bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
