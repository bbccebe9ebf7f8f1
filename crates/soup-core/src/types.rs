//! Row and event types.

use crate::callsign::extract_ssid;
use serde::{Deserialize, Serialize};

/// Current wall-clock time as Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single decoded station position report.
///
/// Rows are append-only: once written they are never updated or deleted.
/// `ssid` is always present, defaulting to `"0"` when the callsign carries
/// no suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationPosition {
    /// Full source callsign including SSID suffix (e.g. "N0CALL-9").
    pub callsign: String,
    /// SSID derived from the callsign suffix, "0" when absent.
    pub ssid: String,
    pub lat: f64,
    pub lon: f64,
    /// Ingestion time, Unix milliseconds.
    pub timestamp_ms: i64,
}

impl StationPosition {
    /// Build a position row observed now, deriving the SSID from the callsign.
    pub fn observed(callsign: impl Into<String>, lat: f64, lon: f64, timestamp_ms: i64) -> Self {
        let callsign = callsign.into();
        let ssid = extract_ssid(&callsign).to_string();
        Self {
            callsign,
            ssid,
            lat,
            lon,
            timestamp_ms,
        }
    }
}

/// A single APRS text message, append-only like positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub recipient: String,
    /// Message body. May be empty.
    pub info: String,
    /// Ingestion time, Unix milliseconds.
    pub timestamp_ms: i64,
}

/// In-memory event broadcast to live subscribers.
///
/// Mirrors the row just written; never persisted separately. Serializes
/// with a `type` discriminator:
/// `{"type":"position","callsign":...}` / `{"type":"message","sender":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LiveEvent {
    Position(StationPosition),
    Message(Message),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_derives_ssid() {
        let pos = StationPosition::observed("N0CALL-9", 43.9, 12.7, 1000);
        assert_eq!(pos.ssid, "9");
        assert_eq!(pos.callsign, "N0CALL-9");
    }

    #[test]
    fn test_observed_defaults_ssid() {
        let pos = StationPosition::observed("N0CALL", 43.9, 12.7, 1000);
        assert_eq!(pos.ssid, "0");
    }

    #[test]
    fn test_live_event_position_tag() {
        let pos = StationPosition::observed("N0CALL-9", 43.9, 12.7, 1000);
        let json = serde_json::to_value(LiveEvent::Position(pos)).unwrap();
        assert_eq!(json["type"], "position");
        assert_eq!(json["callsign"], "N0CALL-9");
        assert_eq!(json["ssid"], "9");
        assert_eq!(json["lat"], 43.9);
    }

    #[test]
    fn test_live_event_message_tag() {
        let msg = Message {
            sender: "N0CALL".to_string(),
            recipient: "N1CALL".to_string(),
            info: "hello".to_string(),
            timestamp_ms: 1000,
        };
        let json = serde_json::to_value(LiveEvent::Message(msg)).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["recipient"], "N1CALL");
    }

    #[test]
    fn test_live_event_round_trip() {
        let pos = StationPosition::observed("IZ6NNH-7", -12.5, -70.25, 42);
        let event = LiveEvent::Position(pos);
        let json = serde_json::to_string(&event).unwrap();
        let back: LiveEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
