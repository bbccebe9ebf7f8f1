//! Decoder and encoder error types.

use thiserror::Error;

/// Errors from frame decoding.
///
/// Every variant means the frame is malformed or unusable; the caller
/// logs and skips it. Valid-but-out-of-scope payloads are not errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Frame truncated: {0}")]
    Truncated(String),

    #[error("Bad AX.25 address field: {0}")]
    BadAddress(String),

    #[error("Not an AX.25 UI frame (control 0x{control:02x})")]
    NotUi { control: u8 },

    #[error("Bad position payload: {0}")]
    BadPosition(String),

    #[error("Bad message payload: {0}")]
    BadMessage(String),
}

/// Errors from outbound UI frame construction.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid callsign: {0}")]
    InvalidCallsign(String),

    #[error("Digipeater path too long ({0} entries, max 8)")]
    PathTooLong(usize),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
