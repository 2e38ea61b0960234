//! Error types for magic packet dispatch.

use thiserror::Error;

/// Errors surfaced to the caller of a wake request.
///
/// Both variants are user-visible: a wake is always triggered by someone
/// pressing a button, so failures are reported rather than retried here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WakeError {
    /// The hardware address did not parse into exactly six octets
    #[error("Invalid hardware address: {0}")]
    AddressInvalid(String),

    /// The datagram could not be handed to the network stack
    #[error("Failed to send magic packet: {0}")]
    SendFailed(String),
}

/// Convenience Result type alias for wake operations.
pub type Result<T> = std::result::Result<T, WakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_error_display() {
        let error = WakeError::AddressInvalid("AA:BB:CC".to_string());
        assert_eq!(error.to_string(), "Invalid hardware address: AA:BB:CC");

        let error = WakeError::SendFailed("network unreachable".to_string());
        assert_eq!(
            error.to_string(),
            "Failed to send magic packet: network unreachable"
        );
    }
}
