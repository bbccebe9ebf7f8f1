//! KISS framing codec.
//!
//! KISS tunnels AX.25 frames over a byte stream: each frame is delimited
//! by FEND bytes, FEND/FESC inside the payload are escaped, and the first
//! byte of every frame is a port/command byte (0x0N = data on port N).

pub const FEND: u8 = 0xC0;
pub const FESC: u8 = 0xDB;
pub const TFEND: u8 = 0xDC;
pub const TFESC: u8 = 0xDD;

/// Data-frame command, port 0.
pub const CMD_DATA: u8 = 0x00;

/// Wrap an AX.25 frame for transmission: FEND, data command byte,
/// escaped payload, FEND.
pub fn escape(frame: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() + 4);
    out.push(FEND);
    out.push(CMD_DATA);
    for &b in frame {
        match b {
            FEND => {
                out.push(FESC);
                out.push(TFEND);
            }
            FESC => {
                out.push(FESC);
                out.push(TFESC);
            }
            other => out.push(other),
        }
    }
    out.push(FEND);
    out
}

/// Incremental KISS de-framer.
///
/// Feed it raw socket reads in any chunking; it yields complete AX.25
/// frames with the command byte stripped. Non-data command frames
/// (hardware parameters echoed by some TNCs) are discarded.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    escaped: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &b in bytes {
            match b {
                FEND => {
                    self.escaped = false;
                    if !self.buf.is_empty() {
                        let frame = std::mem::take(&mut self.buf);
                        if frame.len() > 1 && frame[0] & 0x0F == CMD_DATA {
                            frames.push(frame[1..].to_vec());
                        }
                    }
                }
                FESC => self.escaped = true,
                other => {
                    let byte = if self.escaped {
                        self.escaped = false;
                        match other {
                            TFEND => FEND,
                            TFESC => FESC,
                            // Protocol violation; keep the byte as-is
                            // rather than losing frame sync.
                            unexpected => unexpected,
                        }
                    } else {
                        other
                    };
                    self.buf.push(byte);
                }
            }
        }
        frames
    }
}
