//! Frame decoding for the 125KHz reader module.
//!
//! Frame format:
//! - HEADER (1 byte): 0x02
//! - ID (10 bytes): five identifier bytes as uppercase ASCII hex
//! - CHECKSUM (2 bytes): XOR of the five identifier bytes as ASCII hex
//! - STOP (1 byte): 0x03, optionally surrounded by CR/LF
//!
//! Any of CR, LF, STOP or HEADER arriving before the body is complete
//! aborts the frame.

use crate::tag::{hex_byte, hex_pair, TagFrame, TagId, TAG_HEX_LEN, TAG_ID_LEN};

/// Frame start byte
pub const FRAME_HEADER: u8 = 0x02;

/// Frame stop byte
pub const FRAME_STOP: u8 = 0x03;

/// Carriage return, sent by some reader variants around STOP
pub const FRAME_CR: u8 = 0x0D;

/// Line feed, sent by some reader variants around STOP
pub const FRAME_LF: u8 = 0x0A;

/// Bytes between HEADER and STOP (10 ID digits + 2 checksum digits)
pub const FRAME_BODY_LEN: usize = TAG_HEX_LEN + 2;

/// Complete encoded frame size (HEADER + body + STOP)
pub const FRAME_LEN: usize = 1 + FRAME_BODY_LEN + 1;

/// Reasons a frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// A terminator arrived before the body was complete
    Truncated {
        /// Body bytes received before the abort
        received: u8,
    },
    /// Body complete but the XOR of the identifier did not match
    ChecksumMismatch {
        /// Checksum carried in the frame
        expected: u8,
        /// XOR computed over the decoded identifier
        computed: u8,
    },
}

/// State machine for parsing reader frames
#[derive(Debug, Clone)]
pub struct TagFrameParser {
    state: ParseState,
    body: [u8; FRAME_BODY_LEN],
    received: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Hunting for HEADER
    WaitingForHeader,
    /// Got HEADER, collecting body bytes
    ReadingBody,
}

impl Default for TagFrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TagFrameParser {
    /// Create a new frame parser
    pub const fn new() -> Self {
        Self {
            state: ParseState::WaitingForHeader,
            body: [0; FRAME_BODY_LEN],
            received: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForHeader;
        self.received = 0;
    }

    /// True while hunting for a header (no partial frame buffered)
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::WaitingForHeader
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` when a started frame
    /// is dropped. The parser is ready for the next header after an error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<TagFrame>, FrameError> {
        match self.state {
            ParseState::WaitingForHeader => {
                if byte == FRAME_HEADER {
                    self.start();
                }
                // Silently ignore everything else while hunting
                Ok(None)
            }
            ParseState::ReadingBody => {
                if is_terminator(byte) {
                    // The aborting byte is consumed, even a HEADER
                    let received = self.received as u8;
                    self.reset();
                    return Err(FrameError::Truncated { received });
                }

                self.body[self.received] = byte;
                self.received += 1;
                if self.received < FRAME_BODY_LEN {
                    return Ok(None);
                }

                let result = decode_body(&self.body);
                self.reset();
                result.map(Some)
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame or error found, if any.
    /// Remaining bytes after it are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<TagFrame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    fn start(&mut self) {
        self.state = ParseState::ReadingBody;
        self.received = 0;
    }
}

fn is_terminator(byte: u8) -> bool {
    matches!(byte, FRAME_CR | FRAME_LF | FRAME_STOP | FRAME_HEADER)
}

/// Decode the 12 body characters and validate the checksum
fn decode_body(body: &[u8; FRAME_BODY_LEN]) -> Result<TagFrame, FrameError> {
    let mut id = [0u8; TAG_ID_LEN];
    let mut computed = 0u8;
    let mut expected = 0u8;

    // Each pair of characters is one byte; pair index 5 is the checksum
    for (index, pair) in body.chunks_exact(2).enumerate() {
        let byte = hex_pair(pair[0], pair[1]);
        if index < TAG_ID_LEN {
            id[index] = byte;
            computed ^= byte;
        } else {
            expected = byte;
        }
    }

    if computed != expected {
        return Err(FrameError::ChecksumMismatch { expected, computed });
    }

    let mut raw = [0u8; TAG_HEX_LEN];
    raw.copy_from_slice(&body[..TAG_HEX_LEN]);
    Ok(TagFrame::new(raw, TagId::new(id)))
}

/// Encode an identifier as the reader would send it
///
/// Useful for tests and bench simulation of a reader module.
pub fn encode_frame(id: &TagId) -> [u8; FRAME_LEN] {
    let mut out = [0u8; FRAME_LEN];
    out[0] = FRAME_HEADER;
    out[1..1 + TAG_HEX_LEN].copy_from_slice(&id.to_hex());
    out[1 + TAG_HEX_LEN..1 + FRAME_BODY_LEN].copy_from_slice(&hex_byte(id.checksum()));
    out[FRAME_LEN - 1] = FRAME_STOP;
    out
}
