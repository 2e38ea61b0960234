//! Error types for the wol-polling crate.

/// Errors from polling orchestration.
#[derive(Debug, thiserror::Error)]
pub enum PollingError {
    /// A polling task panicked or could not be joined
    #[error("Failed to join polling task: {0}")]
    TaskJoin(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience type alias for Results using PollingError.
pub type PollingResult<T> = std::result::Result<T, PollingError>;
