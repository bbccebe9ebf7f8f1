//! API error type mapped onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use soup_store::StoreError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("KISS link is not connected")]
    NotConnected,

    #[error("Link write failed: {0}")]
    LinkIo(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Too many live stream connections")]
    TooManyStreams,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
            Self::LinkIo(_) => StatusCode::BAD_GATEWAY,
            Self::Store(e) => {
                error!(error = %e, "Store read failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::TooManyStreams => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.to_string()).into_response()
    }
}
