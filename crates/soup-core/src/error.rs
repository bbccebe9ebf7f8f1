//! Error types for soup-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid callsign: {0}")]
    InvalidCallsign(String),

    #[error("Unknown position range: {0}")]
    UnknownRange(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
