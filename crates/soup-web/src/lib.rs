//! HTTP surface: position/message queries, the live SSE stream, the
//! send-message path, and metrics exposition.

pub mod config;
pub mod error;
pub mod server;

pub use config::WebConfig;
pub use error::ApiError;
pub use server::{create_router, run_server, AppState, ConnectionLimiter};
