//! Server and host message encoding
//!
//! The authorization server speaks a tiny line protocol over short-lived
//! TCP connections:
//! - Controller → Server: `R\n` (reload request), `T<ms>\n` (timestamp),
//!   `<10 hex><Y|N>\n` (scan report)
//! - Server → Controller: a single [`RELOAD_MARKER`] byte followed by the
//!   binary allow-list payload, or anything else for "no reload"
//!
//! The host console receives human-readable report lines.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::tag::TAG_HEX_LEN;

/// Response byte announcing a reload payload
pub const RELOAD_MARKER: u8 = b'R';

/// Request prefix for a reload request
pub const MSG_RELOAD_REQUEST: u8 = b'R';

/// Request prefix for a timestamp report
pub const MSG_TIMESTAMP: u8 = b'T';

/// Scan result suffix for an allowed tag
pub const RESULT_ALLOWED: u8 = b'Y';

/// Scan result suffix for an unknown tag
pub const RESULT_DENIED: u8 = b'N';

/// Longest server message: 10 hex digits + result + newline
pub const MAX_SERVER_MESSAGE_LEN: usize = 16;

/// Longest host line: 10 hex digits + " - Y" + CRLF
pub const MAX_HOST_LINE_LEN: usize = 20;

/// Messages from the controller to the authorization server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerMessage {
    /// Ask the server to push the full allow-list (sent at startup)
    ReloadRequest,
    /// Periodic heartbeat carrying milliseconds since boot
    Timestamp { ms: u32 },
    /// Result of a completed scan
    ScanReport {
        raw: [u8; TAG_HEX_LEN],
        matched: bool,
    },
}

impl ServerMessage {
    /// Encode this message as a newline-terminated line
    pub fn encode(&self) -> Vec<u8, MAX_SERVER_MESSAGE_LEN> {
        let mut out = Vec::new();
        // Capacity covers the longest message, pushes cannot fail
        match self {
            ServerMessage::ReloadRequest => {
                let _ = out.push(MSG_RELOAD_REQUEST);
            }
            ServerMessage::Timestamp { ms } => {
                let _ = out.push(MSG_TIMESTAMP);
                push_decimal(&mut out, *ms);
            }
            ServerMessage::ScanReport { raw, matched } => {
                let _ = out.extend_from_slice(raw);
                let _ = out.push(result_byte(*matched));
            }
        }
        let _ = out.push(b'\n');
        out
    }
}

/// Report lines written to the host console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostLine {
    /// `<10 hex> - Y` or `<10 hex> - N`
    Scan {
        raw: [u8; TAG_HEX_LEN],
        matched: bool,
    },
    /// `T<ms>`
    Heartbeat { ms: u32 },
}

impl HostLine {
    /// Encode this line, CRLF terminated
    pub fn encode(&self) -> Vec<u8, MAX_HOST_LINE_LEN> {
        let mut out = Vec::new();
        match self {
            HostLine::Scan { raw, matched } => {
                let _ = out.extend_from_slice(raw);
                let _ = out.extend_from_slice(b" - ");
                let _ = out.push(result_byte(*matched));
            }
            HostLine::Heartbeat { ms } => {
                let _ = out.push(MSG_TIMESTAMP);
                push_decimal(&mut out, *ms);
            }
        }
        let _ = out.extend_from_slice(b"\r\n");
        out
    }
}

fn result_byte(matched: bool) -> u8 {
    if matched {
        RESULT_ALLOWED
    } else {
        RESULT_DENIED
    }
}

fn push_decimal<const N: usize>(out: &mut Vec<u8, N>, value: u32) {
    // u32::MAX has 10 digits
    let mut digits: String<10> = String::new();
    let _ = write!(digits, "{}", value);
    let _ = out.extend_from_slice(digits.as_bytes());
}
