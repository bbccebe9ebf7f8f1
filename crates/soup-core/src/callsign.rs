//! Callsign helpers.

/// Extract the SSID suffix from a callsign, defaulting to `"0"`.
///
/// `"N0CALL-9"` yields `"9"`; `"N0CALL"` yields `"0"`.
pub fn extract_ssid(callsign: &str) -> &str {
    match callsign.rsplit_once('-') {
        Some((_, ssid)) => ssid,
        None => "0",
    }
}

/// The base callsign without the SSID suffix.
pub fn base_callsign(callsign: &str) -> &str {
    match callsign.rsplit_once('-') {
        Some((base, _)) => base,
        None => callsign,
    }
}
