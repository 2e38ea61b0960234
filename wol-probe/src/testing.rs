//! Scripted stand-ins for the network, for use in tests.
//!
//! Enabled with the `test-support` feature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::probe::Connector;
use crate::status::ProbeOutcome;
use crate::telemetry::TelemetrySource;

/// What a scripted connect attempt does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptedAttempt {
    /// Resolve to `outcome` after `delay`
    Resolve { outcome: ProbeOutcome, delay: Duration },
    /// Never resolve; only the caller's timeout ends the attempt
    Hang,
}

impl ScriptedAttempt {
    pub fn now(outcome: ProbeOutcome) -> Self {
        Self::Resolve {
            outcome,
            delay: Duration::ZERO,
        }
    }

    pub fn after(outcome: ProbeOutcome, delay: Duration) -> Self {
        Self::Resolve { outcome, delay }
    }
}

/// [`Connector`] that replays per-(address, port) scripts and records calls.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    scripts: Mutex<HashMap<(String, u16), ScriptedAttempt>>,
    calls: Mutex<Vec<(String, u16)>>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the attempt for `address:port`. Unscripted attempts hang.
    pub fn script(&self, address: &str, port: u16, attempt: ScriptedAttempt) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert((address.to_string(), port), attempt);
        }
    }

    pub fn calls(&self) -> Vec<(String, u16)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, address: &str) -> usize {
        self.calls().iter().filter(|(a, _)| a == address).count()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, address: &str, port: u16) -> ProbeOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((address.to_string(), port));
        }

        let attempt = self
            .scripts
            .lock()
            .ok()
            .and_then(|s| s.get(&(address.to_string(), port)).copied())
            .unwrap_or(ScriptedAttempt::Hang);

        match attempt {
            ScriptedAttempt::Resolve { outcome, delay } => {
                tokio::time::sleep(delay).await;
                outcome
            }
            ScriptedAttempt::Hang => std::future::pending().await,
        }
    }
}

/// [`TelemetrySource`] that returns scripted readings per address.
///
/// Each address has a queue of readings; the last one repeats forever once
/// the queue is drained. Unknown addresses yield `None`.
#[derive(Debug, Default)]
pub struct ScriptedTelemetry {
    readings: Mutex<HashMap<String, Vec<Option<f64>>>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl ScriptedTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, address: &str, readings: Vec<Option<f64>>) {
        if let Ok(mut map) = self.readings.lock() {
            map.insert(address.to_string(), readings);
        }
    }

    pub fn fetch_count(&self, address: &str) -> usize {
        self.fetches
            .lock()
            .ok()
            .and_then(|f| f.get(address).copied())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TelemetrySource for ScriptedTelemetry {
    async fn fetch_reading(&self, address: &str) -> Option<f64> {
        if let Ok(mut fetches) = self.fetches.lock() {
            *fetches.entry(address.to_string()).or_insert(0) += 1;
        }

        let mut map = self.readings.lock().ok()?;
        let queue = map.get_mut(address)?;
        if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().copied().flatten()
        }
    }
}
