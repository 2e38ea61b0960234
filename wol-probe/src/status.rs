//! Host health model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived health of a monitored host.
///
/// Never persisted; always recomputed from the latest probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// No probe has completed yet, or the host has no network address
    #[default]
    Unknown,
    /// The monitored service accepted a connection
    Online,
    /// The host is reachable but the monitored service is not answering
    Warning,
    /// Nothing answered on either probe port
    Offline,
}

impl Status {
    /// Short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Online => "Online",
            Status::Warning => "Service Offline",
            Status::Offline => "Offline",
            Status::Unknown => "Checking Status...",
        }
    }

    /// Semantic color name for status indicators.
    pub fn color_name(&self) -> &'static str {
        match self {
            Status::Online => "green",
            Status::Warning => "orange",
            Status::Offline => "red",
            Status::Unknown => "gray",
        }
    }

    /// Whether the host itself answered on the network.
    pub fn is_reachable(&self) -> bool {
        matches!(self, Status::Online | Status::Warning)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a single TCP connect attempt resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeOutcome {
    /// The handshake completed
    Connected,
    /// The peer actively rejected the connection (RST)
    Refused,
    /// Timeout, unreachable, resolution failure, or anything else
    Ambiguous,
}

impl ProbeOutcome {
    /// Whether the peer answered at all, either way.
    pub fn is_responsive(&self) -> bool {
        matches!(self, ProbeOutcome::Connected | ProbeOutcome::Refused)
    }
}
