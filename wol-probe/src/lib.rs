//! # wol-probe
//!
//! Network leaf operations for LAN host monitoring:
//!
//! - [`StatusProbe`] classifies a host as Online / Warning / Offline using a
//!   two-stage TCP connect heuristic, always within a fixed time bound.
//! - [`TelemetryFetcher`] reads a single `CPU Temperature: <n> C` reading from
//!   a host's helper service.
//!
//! Neither raises to its caller: faults become a [`Status`] or "no reading".
//!
//! ```no_run
//! use wol_probe::{StatusProbe, TelemetryFetcher, TelemetrySource};
//!
//! # async fn demo() {
//! let status = StatusProbe::default().determine("192.168.1.20").await;
//! println!("{}", status.label());
//!
//! if let Some(temp) = TelemetryFetcher::default().fetch_reading("192.168.1.20").await {
//!     println!("{temp:.1} C");
//! }
//! # }
//! ```

mod config;
mod error;
mod probe;
mod status;
mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{ProbeConfig, TelemetryConfig, DEFAULT_REACHABILITY_PORT, DEFAULT_SERVICE_PORT};
pub use error::{ProbeError, Result};
pub use probe::{classify, Connector, StatusProbe, TcpConnector};
pub use status::{ProbeOutcome, Status};
pub use telemetry::{parse_reading, TelemetryFetcher, TelemetrySource};
