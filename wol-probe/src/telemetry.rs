//! Plaintext telemetry fetcher
//!
//! The helper service on a monitored host answers a bare TCP connection with
//! a short text blob containing a line such as `CPU Temperature: 47.5 C`.
//! Each fetch opens its own connection, reads until the peer closes (or the
//! reading has been seen, or the budget runs out), and closes it again.

use std::fmt;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use crate::config::TelemetryConfig;
use crate::error::{ProbeError, Result};
use crate::probe::host_part;

const READING_PATTERN: &str = r"CPU Temperature: (-?\d+(?:\.\d*)?) C";

fn reading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(READING_PATTERN).expect("telemetry pattern is valid"))
}

/// Extract the temperature reading from a telemetry response.
///
/// Returns `None` for anything that does not contain the expected line; that
/// is a soft failure, not an error.
pub fn parse_reading(text: &str) -> Option<f64> {
    let captures = reading_regex().captures(text)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Something that can produce a numeric reading for an address.
///
/// Never fails: every fault is reported as `None` ("no reading this cycle").
#[async_trait]
pub trait TelemetrySource: Send + Sync + fmt::Debug {
    async fn fetch_reading(&self, address: &str) -> Option<f64>;
}

/// Fetches readings over TCP.
#[derive(Debug, Clone, Default)]
pub struct TelemetryFetcher {
    config: TelemetryConfig,
}

impl TelemetryFetcher {
    pub fn new(config: TelemetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Fetch one reading, reporting why it failed.
    ///
    /// Connect and read share a single deadline of `config.timeout`. The
    /// stream is owned by this call and closed on every return path.
    pub async fn fetch(&self, address: &str) -> Result<f64> {
        let host = host_part(address);
        if host.is_empty() {
            return Err(ProbeError::AddressInvalid(address.to_string()));
        }

        let deadline = Instant::now() + self.config.timeout;
        let port = self.config.port;

        let mut stream = match timeout_at(deadline, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ProbeError::ConnectFailed {
                    address: host.to_string(),
                    port,
                    source,
                })
            }
            Err(_) => return Err(ProbeError::Timeout(self.config.timeout)),
        };

        let mut response = Vec::with_capacity(256);
        let mut chunk = [0u8; 512];

        loop {
            match timeout_at(deadline, stream.read(&mut chunk)).await {
                // Peer closed
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&chunk[..n]);
                    if response.len() >= self.config.max_response_bytes {
                        response.truncate(self.config.max_response_bytes);
                        break;
                    }
                    if parse_reading(&String::from_utf8_lossy(&response)).is_some() {
                        break;
                    }
                }
                Ok(Err(source)) => {
                    if response.is_empty() {
                        return Err(ProbeError::ReadFailed {
                            address: host.to_string(),
                            source,
                        });
                    }
                    break;
                }
                Err(_) => {
                    if response.is_empty() {
                        return Err(ProbeError::Timeout(self.config.timeout));
                    }
                    break;
                }
            }
        }
        drop(stream);

        let text = String::from_utf8_lossy(&response);
        parse_reading(&text).ok_or_else(|| ProbeError::ParseFailed(preview(&text)))
    }
}

#[async_trait]
impl TelemetrySource for TelemetryFetcher {
    async fn fetch_reading(&self, address: &str) -> Option<f64> {
        match self.fetch(address).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Telemetry fetch from {} failed: {}", address, e);
                None
            }
        }
    }
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 64;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CPU Temperature: 47.5 C", Some(47.5))]
    #[case("CPU Temperature: 52 C\n", Some(52.0))]
    #[case("CPU Temperature: 61. C", Some(61.0))]
    #[case("CPU Temperature: -3.25 C", Some(-3.25))]
    #[case("uptime: 4d\nCPU Temperature: 38.0 C\nload: 0.3\n", Some(38.0))]
    #[case("CPU Temperature: 45.5 F", None)]
    #[case("CPU Temperature: warm C", None)]
    #[case("GPU Temperature: 60 C", None)]
    #[case("", None)]
    fn test_parse_reading(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_reading(input), expected);
    }

    #[test]
    fn test_preview_truncates_long_responses() {
        let long = "x".repeat(200);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.len(), 67);
        assert_eq!(preview("  short \n"), "short");
    }

    #[tokio::test]
    async fn test_empty_address_is_invalid() {
        let fetcher = TelemetryFetcher::default();
        let err = fetcher.fetch(" ").await.unwrap_err();
        assert!(matches!(err, ProbeError::AddressInvalid(_)));
        assert_eq!(fetcher.fetch_reading("").await, None);
    }
}
