//! Configuration for the coordinator.

use std::time::Duration;

use wol_polling::PollingConfig;
use wol_probe::{ProbeConfig, TelemetryConfig};
use wol_wake::WakeTarget;

use crate::error::MonitorError;

/// Configuration for [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Period of the background status sweep
    /// Default: 10 seconds
    pub refresh_interval: Duration,

    /// Quiet period after a registry change before polling is reconciled
    /// Default: 500 milliseconds
    pub reconcile_debounce: Duration,

    /// Status probe ports and timeouts
    pub probe: ProbeConfig,

    /// Telemetry polling settings
    pub polling: PollingConfig,

    /// Where wake packets are sent
    pub wake: WakeTarget,

    /// Capacity of the handle-to-coordinator command channel
    /// Default: 64
    pub command_buffer: usize,

    /// Capacity of the broadcast event channel
    /// Default: 256
    pub event_buffer: usize,

    /// Capacity of the polling-task update channel
    /// Default: 256
    pub update_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
            reconcile_debounce: Duration::from_millis(500),
            probe: ProbeConfig::default(),
            polling: PollingConfig::default(),
            wake: WakeTarget::default(),
            command_buffer: 64,
            event_buffer: 256,
            update_buffer: 256,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timers everywhere, for demos and tests against loopback hosts.
    pub fn fast() -> Self {
        Self {
            refresh_interval: Duration::from_secs(1),
            reconcile_debounce: Duration::from_millis(50),
            probe: ProbeConfig::default()
                .with_timeouts(Duration::from_millis(300), Duration::from_millis(300)),
            polling: PollingConfig::default()
                .with_poll_interval(Duration::from_millis(200))
                .with_telemetry(TelemetryConfig::default().with_timeout(Duration::from_millis(300))),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.refresh_interval.is_zero() {
            return Err(MonitorError::Configuration(
                "Refresh interval must be greater than 0".to_string(),
            ));
        }

        if self.command_buffer == 0 || self.event_buffer == 0 || self.update_buffer == 0 {
            return Err(MonitorError::Configuration(
                "Channel buffers must be greater than 0".to_string(),
            ));
        }

        self.probe
            .validate()
            .map_err(|e| MonitorError::Configuration(e.to_string()))?;
        self.polling
            .validate()
            .map_err(|e| MonitorError::Configuration(e.to_string()))
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_reconcile_debounce(mut self, debounce: Duration) -> Self {
        self.reconcile_debounce = debounce;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_wake_target(mut self, wake: WakeTarget) -> Self {
        self.wake = wake;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.reconcile_debounce, Duration::from_millis(500));
        assert_eq!(config.probe.service_port, 51201);
        assert_eq!(config.wake.port, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fast_preset_is_valid() {
        let config = MonitorConfig::fast();
        assert!(config.validate().is_ok());
        assert!(config.probe.max_duration() < Duration::from_secs(1));
    }

    #[test]
    fn test_config_validation() {
        assert!(MonitorConfig::new()
            .with_refresh_interval(Duration::ZERO)
            .validate()
            .is_err());

        let mut config = MonitorConfig::new();
        config.event_buffer = 0;
        assert!(config.validate().is_err());

        assert!(MonitorConfig::new()
            .with_polling(PollingConfig::new().with_max_concurrent_tasks(0))
            .validate()
            .is_err());
    }
}
