//! Link error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    /// No live connection; the caller reports delivery failure upstream
    /// instead of retrying.
    #[error("not connected to the TNC")]
    NotConnected,

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("link closed by remote")]
    Closed,

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LinkResult<T> = Result<T, LinkError>;
