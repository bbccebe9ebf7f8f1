//! KISS/TNC TCP link management.
//!
//! Owns the single connection to the packet source:
//! - `kiss`: KISS framing codec (escape/unescape, incremental de-framing)
//! - `LinkManager`: connect/read/reconnect state machine with a fixed
//!   backoff, running until shutdown
//! - `LinkHandle`: clonable, reconnect-safe handle for outbound sends
//!
//! At most one connected handle exists at any time; the manager task is
//! the only writer of the shared connection slot.

pub mod error;
pub mod kiss;
pub mod manager;

pub use error::{LinkError, LinkResult};
pub use manager::{LinkConfig, LinkHandle, LinkManager, LinkState};
