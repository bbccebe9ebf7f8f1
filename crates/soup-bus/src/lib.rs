//! Live event fan-out.
//!
//! Each subscriber gets its own unbounded channel, so a slow consumer
//! never drops or delays events for the others. Subscribers whose
//! receiving side has gone away are evicted on the next publish.

pub mod bus;

pub use bus::{EventBus, Subscription};
