//! Tiered TCP reachability probe
//!
//! Raw ICMP echo needs privileges we do not have, so reachability is inferred
//! from TCP connect outcomes instead. Two stages run sequentially:
//!
//! 1. Connect to the service port. A completed handshake means the service is
//!    up ([`Status::Online`]); an explicit refusal means the host is up but the
//!    service is not ([`Status::Warning`]).
//! 2. Any other result on stage 1 is ambiguous (timeout, unreachable, DNS
//!    failure) so a second, independent port is tried. Any answer there, even
//!    a refusal, proves the host is up ([`Status::Warning`]); silence means
//!    [`Status::Offline`].
//!
//! Every attempt is wrapped in its own timeout, so `determine` always returns
//! within `service_timeout + reachability_timeout`.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::ProbeConfig;
use crate::status::{ProbeOutcome, Status};

/// Performs one TCP connect attempt and reports how it resolved.
///
/// Implementations do not need to enforce a timeout; [`StatusProbe`] bounds
/// every call and treats an expired attempt as [`ProbeOutcome::Ambiguous`].
/// Dropping the returned future must release any socket it holds.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    async fn connect(&self, address: &str, port: u16) -> ProbeOutcome;
}

/// [`Connector`] backed by a real `tokio::net::TcpStream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, address: &str, port: u16) -> ProbeOutcome {
        let host = host_part(address);

        match TcpStream::connect((host, port)).await {
            Ok(stream) => {
                // No payload is exchanged; close immediately
                drop(stream);
                ProbeOutcome::Connected
            }
            Err(e) => classify_io_error(address, port, &e),
        }
    }
}

/// Map a connect error onto the three-way outcome.
pub(crate) fn classify_io_error(address: &str, port: u16, error: &io::Error) -> ProbeOutcome {
    if error.kind() == io::ErrorKind::ConnectionRefused {
        tracing::debug!("{}:{} refused connection", address, port);
        ProbeOutcome::Refused
    } else {
        tracing::debug!("{}:{} connect failed: {}", address, port, error);
        ProbeOutcome::Ambiguous
    }
}

/// Strip whitespace and IPv6 brackets so `[fe80::1]` and `fe80::1` both resolve.
pub(crate) fn host_part(address: &str) -> &str {
    let trimmed = address.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed)
}

/// Classifies a host into a [`Status`].
#[derive(Clone)]
pub struct StatusProbe {
    config: ProbeConfig,
    connector: Arc<dyn Connector>,
}

impl fmt::Debug for StatusProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusProbe")
            .field("config", &self.config)
            .field("connector", &self.connector)
            .finish()
    }
}

impl Default for StatusProbe {
    fn default() -> Self {
        Self::new(ProbeConfig::default())
    }
}

impl StatusProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    pub fn with_connector(config: ProbeConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Determine the status of the host at `address`.
    ///
    /// Total: never fails, never exceeds [`ProbeConfig::max_duration`]. An
    /// empty address yields [`Status::Unknown`] without touching the network.
    pub async fn determine(&self, address: &str) -> Status {
        let address = address.trim();
        if address.is_empty() {
            return Status::Unknown;
        }

        let service = self
            .attempt(address, self.config.service_port, self.config.service_timeout)
            .await;

        let reachability = if service == ProbeOutcome::Ambiguous {
            tracing::debug!(
                "{}: service port {} ambiguous, checking port {}",
                address,
                self.config.service_port,
                self.config.reachability_port
            );
            Some(
                self.attempt(
                    address,
                    self.config.reachability_port,
                    self.config.reachability_timeout,
                )
                .await,
            )
        } else {
            None
        };

        let status = classify(service, reachability);
        tracing::debug!(
            "{}: service={:?} reachability={:?} => {:?}",
            address,
            service,
            reachability,
            status
        );
        status
    }

    /// One bounded connect attempt.
    ///
    /// Whichever of completion or timeout happens first decides the outcome;
    /// the losing branch is dropped, which closes its socket.
    pub async fn attempt(&self, address: &str, port: u16, timeout: Duration) -> ProbeOutcome {
        match tokio::time::timeout(timeout, self.connector.connect(address, port)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::debug!("{}:{} timed out after {:?}", address, port, timeout);
                ProbeOutcome::Ambiguous
            }
        }
    }
}

/// Combine stage outcomes into a [`Status`].
///
/// `reachability` is only consulted when the service stage was ambiguous.
pub fn classify(service: ProbeOutcome, reachability: Option<ProbeOutcome>) -> Status {
    match service {
        ProbeOutcome::Connected => Status::Online,
        ProbeOutcome::Refused => Status::Warning,
        ProbeOutcome::Ambiguous => match reachability {
            Some(outcome) if outcome.is_responsive() => Status::Warning,
            _ => Status::Offline,
        },
    }
}
