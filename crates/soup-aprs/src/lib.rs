//! AX.25/APRS frame decoding and encoding.
//!
//! This crate is the pure decoder adapter between raw AX.25 frame bytes
//! (as delivered by the KISS link) and domain records:
//!
//! - `decode`: AX.25 UI frame parse + APRS information-field parse into a
//!   [`DecodedRecord`]
//! - [`DecodedRecord::classify`]: position / message / other
//! - [`ax25::encode_ui`]: outbound UI frame construction for message sends
//!
//! Decoding is side-effect free. Malformed input yields [`DecodeError`];
//! valid frames whose payload type is out of scope (status reports,
//! telemetry, compressed positions, Mic-E) decode to a record that
//! classifies as [`FrameClass::Other`].

pub mod ax25;
pub mod error;
pub mod record;

pub use ax25::{encode_ui, Address, Ax25Frame};
pub use error::{DecodeError, DecodeResult, EncodeError};
pub use record::{decode, DecodedRecord, FrameClass};
