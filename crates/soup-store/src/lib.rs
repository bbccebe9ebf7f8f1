//! Append-only persistence for positions and messages.
//!
//! Rows are appended to JSON Lines journals on disk and mirrored into
//! in-memory read indexes. The journals are the source of truth; the
//! indexes are rebuilt by replaying them at startup.

pub mod error;
pub mod journal;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::Store;
