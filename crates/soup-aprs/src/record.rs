//! APRS information-field parsing and frame classification.

use crate::ax25;
use crate::error::{DecodeError, DecodeResult};

/// The decoded content of one APRS frame.
///
/// Carries the source callsign plus whatever the information field
/// yielded: coordinates for position reports, recipient and body for
/// text messages, neither for out-of-scope payload types.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// Full source callsign including SSID suffix.
    pub source: String,
    pub coords: Option<(f64, f64)>,
    pub message: Option<(String, String)>,
}

/// Classification of a decoded record.
///
/// Coordinates win over everything else: a record with both a position
/// and message-like fields is a position event.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameClass {
    Position {
        callsign: String,
        lat: f64,
        lon: f64,
    },
    Message {
        sender: String,
        recipient: String,
        body: String,
    },
    Other,
}

impl DecodedRecord {
    pub fn classify(self) -> FrameClass {
        if let Some((lat, lon)) = self.coords {
            return FrameClass::Position {
                callsign: self.source,
                lat,
                lon,
            };
        }
        if let Some((recipient, body)) = self.message {
            if !recipient.is_empty() {
                return FrameClass::Message {
                    sender: self.source,
                    recipient,
                    body,
                };
            }
        }
        FrameClass::Other
    }
}

/// Decode one raw AX.25 frame into a [`DecodedRecord`].
///
/// Pure function; malformed input yields `DecodeError`, never a partial
/// record. Valid frames carrying payload types outside position/message
/// scope decode successfully with neither field set.
pub fn decode(raw: &[u8]) -> DecodeResult<DecodedRecord> {
    let frame = ax25::parse_frame(raw)?;
    if !frame.is_ui() {
        return Err(DecodeError::NotUi {
            control: frame.control,
        });
    }

    let (coords, message) = parse_info(&frame.info)?;
    Ok(DecodedRecord {
        source: frame.source.callsign(),
        coords,
        message,
    })
}

type InfoFields = (Option<(f64, f64)>, Option<(String, String)>);

fn parse_info(info: &[u8]) -> DecodeResult<InfoFields> {
    let Some(&dti) = info.first() else {
        return Ok((None, None));
    };
    match dti {
        // Position without timestamp ('!' may also appear after a leading
        // comment in old TNCs; only the leading form is handled here).
        b'!' | b'=' => Ok((parse_position(&info[1..])?, None)),
        // Position with 7-character timestamp, which is skipped: the row
        // timestamp is ingestion time.
        b'/' | b'@' => {
            if info.len() < 8 {
                return Err(DecodeError::BadPosition("timestamp truncated".to_string()));
            }
            Ok((parse_position(&info[8..])?, None))
        }
        b':' => Ok((None, Some(parse_message(info)?))),
        // Status, telemetry, objects, Mic-E, weather and the rest of the
        // APRS zoo are valid but out of scope.
        _ => Ok((None, None)),
    }
}

/// Parse an uncompressed position: `DDMM.mmN` sym `DDDMM.mmE`.
///
/// A non-digit lead byte means a compressed-format position, which is out
/// of scope and yields no coordinates rather than an error.
fn parse_position(data: &[u8]) -> DecodeResult<Option<(f64, f64)>> {
    match data.first() {
        Some(b) if b.is_ascii_digit() => {}
        _ => return Ok(None),
    }
    if data.len() < 18 {
        return Err(DecodeError::BadPosition("coordinate field truncated".to_string()));
    }
    let lat = parse_coord(&data[..8], 2, b'N', b'S', 90.0)?;
    let lon = parse_coord(&data[9..18], 3, b'E', b'W', 180.0)?;
    Ok(Some((lat, lon)))
}

fn parse_coord(
    field: &[u8],
    deg_digits: usize,
    pos_hemi: u8,
    neg_hemi: u8,
    max_abs: f64,
) -> DecodeResult<f64> {
    let digits = &field[..deg_digits];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::BadPosition("non-digit degrees".to_string()));
    }
    let deg: f64 = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DecodeError::BadPosition("bad degrees".to_string()))?;

    let min_field = &field[deg_digits..deg_digits + 5];
    let minutes: f64 = std::str::from_utf8(min_field)
        .ok()
        .filter(|s| s.as_bytes()[2] == b'.')
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DecodeError::BadPosition("bad minutes".to_string()))?;
    if minutes >= 60.0 {
        return Err(DecodeError::BadPosition(format!("minutes out of range: {minutes}")));
    }

    let hemi = field[deg_digits + 5];
    let sign = if hemi == pos_hemi {
        1.0
    } else if hemi == neg_hemi {
        -1.0
    } else {
        return Err(DecodeError::BadPosition(format!(
            "bad hemisphere indicator 0x{hemi:02x}"
        )));
    };

    let value = sign * (deg + minutes / 60.0);
    if value.abs() > max_abs {
        return Err(DecodeError::BadPosition(format!("coordinate out of range: {value}")));
    }
    Ok(value)
}

/// Parse a text message: `:ADDRESSEE:body{id`.
///
/// The addressee field is space-padded to 9 characters; a trailing `{id`
/// message number is stripped from the body.
fn parse_message(info: &[u8]) -> DecodeResult<(String, String)> {
    if info.len() < 11 || info[10] != b':' {
        return Err(DecodeError::BadMessage("missing addressee delimiter".to_string()));
    }
    let addressee = String::from_utf8_lossy(&info[1..10]).trim_end().to_string();
    if addressee.is_empty() {
        return Err(DecodeError::BadMessage("empty addressee".to_string()));
    }
    let mut body = String::from_utf8_lossy(&info[11..]).into_owned();
    if let Some(idx) = body.rfind('{') {
        body.truncate(idx);
    }
    Ok((addressee, body))
}
