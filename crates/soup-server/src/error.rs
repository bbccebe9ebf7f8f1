//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] soup_telemetry::TelemetryError),

    #[error("Store error: {0}")]
    Store(#[from] soup_store::StoreError),

    #[error("Link error: {0}")]
    Link(#[from] soup_link::LinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
