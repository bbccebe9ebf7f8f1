//! AX.25 frame parsing and UI frame construction.
//!
//! Addresses are stored left-shifted by one bit on the wire; the SSID
//! lives in the low nibble of the seventh byte, whose LSB marks the end
//! of the address field. APRS traffic is carried in UI frames
//! (control 0x03, PID 0xF0).

use crate::error::{DecodeError, DecodeResult, EncodeError};
use std::fmt;

const ADDR_LEN: usize = 7;
/// Destination + source + up to 8 digipeaters.
const MAX_ADDRESSES: usize = 10;
const CONTROL_UI: u8 = 0x03;
const PID_NO_LAYER3: u8 = 0xF0;

/// A parsed AX.25 address: base callsign plus SSID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub call: String,
    pub ssid: u8,
    /// Has-been-repeated bit (H bit), set by digipeaters.
    pub repeated: bool,
}

impl Address {
    /// Full callsign string, omitting a zero SSID: "N0CALL-9" / "N0CALL".
    pub fn callsign(&self) -> String {
        if self.ssid == 0 {
            self.call.clone()
        } else {
            format!("{}-{}", self.call, self.ssid)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.call)
        } else {
            write!(f, "{}-{}", self.call, self.ssid)
        }
    }
}

/// A parsed AX.25 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Ax25Frame {
    pub destination: Address,
    pub source: Address,
    pub path: Vec<Address>,
    pub control: u8,
    pub pid: u8,
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// True for UI frames regardless of the poll/final bit.
    pub fn is_ui(&self) -> bool {
        self.control & !0x10 == CONTROL_UI
    }
}

fn parse_address(chunk: &[u8]) -> DecodeResult<(Address, bool)> {
    let mut call = String::with_capacity(6);
    for &b in &chunk[..6] {
        let c = (b >> 1) as char;
        if c == ' ' {
            break;
        }
        if !c.is_ascii_alphanumeric() {
            return Err(DecodeError::BadAddress(format!(
                "non-alphanumeric byte 0x{b:02x}"
            )));
        }
        call.push(c);
    }
    if call.is_empty() {
        return Err(DecodeError::BadAddress("empty callsign".to_string()));
    }
    let ssid_byte = chunk[6];
    let addr = Address {
        call,
        ssid: (ssid_byte >> 1) & 0x0F,
        repeated: ssid_byte & 0x80 != 0,
    };
    let last = ssid_byte & 0x01 != 0;
    Ok((addr, last))
}

/// Parse a raw (KISS de-framed) AX.25 frame.
pub fn parse_frame(raw: &[u8]) -> DecodeResult<Ax25Frame> {
    // Smallest useful frame: dest + src + control + pid.
    if raw.len() < 2 * ADDR_LEN + 2 {
        return Err(DecodeError::Truncated(format!("{} bytes", raw.len())));
    }

    let mut addresses = Vec::with_capacity(2);
    let mut offset = 0;
    loop {
        if addresses.len() == MAX_ADDRESSES {
            return Err(DecodeError::BadAddress("address field too long".to_string()));
        }
        let end = offset + ADDR_LEN;
        if end > raw.len() {
            return Err(DecodeError::Truncated("address field".to_string()));
        }
        let (addr, last) = parse_address(&raw[offset..end])?;
        addresses.push(addr);
        offset = end;
        if last {
            break;
        }
    }
    if addresses.len() < 2 {
        return Err(DecodeError::BadAddress("missing source address".to_string()));
    }

    if offset + 2 > raw.len() {
        return Err(DecodeError::Truncated("control/pid".to_string()));
    }
    let control = raw[offset];
    let pid = raw[offset + 1];
    let info = raw[offset + 2..].to_vec();

    let mut iter = addresses.into_iter();
    // Two elements guaranteed above.
    let destination = iter.next().ok_or_else(|| {
        DecodeError::BadAddress("missing destination address".to_string())
    })?;
    let source = iter
        .next()
        .ok_or_else(|| DecodeError::BadAddress("missing source address".to_string()))?;

    Ok(Ax25Frame {
        destination,
        source,
        path: iter.collect(),
        control,
        pid,
        info,
    })
}

/// Split "CALL-SSID" into validated parts for encoding.
fn split_callsign(callsign: &str) -> Result<(String, u8), EncodeError> {
    let (base, ssid) = match callsign.rsplit_once('-') {
        Some((base, ssid)) => {
            let ssid: u8 = ssid
                .parse()
                .map_err(|_| EncodeError::InvalidCallsign(callsign.to_string()))?;
            (base, ssid)
        }
        None => (callsign, 0),
    };
    if base.is_empty() || base.len() > 6 || ssid > 15 {
        return Err(EncodeError::InvalidCallsign(callsign.to_string()));
    }
    if !base.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EncodeError::InvalidCallsign(callsign.to_string()));
    }
    Ok((base.to_ascii_uppercase(), ssid))
}

fn push_address(out: &mut Vec<u8>, base: &str, ssid: u8, last: bool) {
    for i in 0..6 {
        let c = base.as_bytes().get(i).copied().unwrap_or(b' ');
        out.push(c << 1);
    }
    // 0x60: reserved bits set, C/H bit clear.
    let mut ssid_byte = 0x60 | (ssid << 1);
    if last {
        ssid_byte |= 0x01;
    }
    out.push(ssid_byte);
}

/// Build a raw AX.25 UI frame: destination, source, digipeater path,
/// control 0x03, PID 0xF0, information field.
pub fn encode_ui(
    destination: &str,
    source: &str,
    path: &[&str],
    info: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    if path.len() > 8 {
        return Err(EncodeError::PathTooLong(path.len()));
    }
    let dest = split_callsign(destination)?;
    let src = split_callsign(source)?;
    let digis = path
        .iter()
        .map(|p| split_callsign(p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity((2 + digis.len()) * ADDR_LEN + 2 + info.len());
    push_address(&mut out, &dest.0, dest.1, false);
    let src_is_last = digis.is_empty();
    push_address(&mut out, &src.0, src.1, src_is_last);
    for (i, (base, ssid)) in digis.iter().enumerate() {
        push_address(&mut out, base, *ssid, i == digis.len() - 1);
    }
    out.push(CONTROL_UI);
    out.push(PID_NO_LAYER3);
    out.extend_from_slice(info);
    Ok(out)
}
