//! Configuration for the polling orchestrator.

use std::time::Duration;

use wol_probe::TelemetryConfig;

use crate::error::PollingError;

/// Configuration for [`PollingOrchestrator`](crate::PollingOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Sleep between fetch cycles of one sensor
    /// Default: 5 seconds
    pub poll_interval: Duration,

    /// Telemetry fetch settings (port, per-attempt timeout)
    pub telemetry: TelemetryConfig,

    /// Upper bound on concurrently running polling tasks
    /// Default: 256
    pub max_concurrent_tasks: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            telemetry: TelemetryConfig::default(),
            max_concurrent_tasks: 256,
        }
    }
}

impl PollingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), PollingError> {
        if self.poll_interval.is_zero() {
            return Err(PollingError::Configuration(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_tasks == 0 {
            return Err(PollingError::Configuration(
                "Max concurrent tasks must be greater than 0".to_string(),
            ));
        }

        self.telemetry
            .validate()
            .map_err(|e| PollingError::Configuration(e.to_string()))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }
}
