//! APRS ingestion and fan-out server.
//!
//! Wires the KISS link, decoder, store, event bus, and HTTP surface
//! into one long-running process.

pub mod app;
pub mod config;
pub mod error;
pub mod ingest;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
