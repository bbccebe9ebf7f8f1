//! Core domain types for the APRS Soup server.
//!
//! This crate provides the fundamental types shared across the system:
//! - `StationPosition`, `Message`: the two append-only row types
//! - `LiveEvent`: the tagged union broadcast to live subscribers
//! - `PositionRange`: the time windows accepted by the positions query
//! - callsign/SSID helpers

pub mod callsign;
pub mod error;
pub mod range;
pub mod types;

pub use callsign::extract_ssid;
pub use error::{CoreError, Result};
pub use range::PositionRange;
pub use types::{now_ms, LiveEvent, Message, StationPosition};
