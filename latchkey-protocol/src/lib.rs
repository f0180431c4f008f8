//! Latchkey wire protocols
//!
//! This crate covers the two byte-level protocols the door controller speaks:
//!
//! - The 125KHz reader module's ASCII frame, decoded by [`TagFrameParser`]:
//! ```text
//! ┌────────┬──────────────────┬──────────────┬──────┐
//! │ HEADER │ ID (hex ASCII)   │ CHECKSUM     │ STOP │
//! │ 0x02   │ 10B → 5 bytes    │ 2B → 1 byte  │ 0x03 │
//! └────────┴──────────────────┴──────────────┴──────┘
//! ```
//!   The checksum is the XOR of the five identifier bytes.
//!
//! - The line-oriented text protocol spoken with the authorization server,
//!   plus the host console report lines ([`messages`]).

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;
pub mod tag;

pub use frame::{encode_frame, FrameError, TagFrameParser, FRAME_BODY_LEN, FRAME_HEADER};
pub use messages::{HostLine, ServerMessage, MAX_HOST_LINE_LEN, MAX_SERVER_MESSAGE_LEN, RELOAD_MARKER};
pub use tag::{TagFrame, TagId, TAG_HEX_LEN, TAG_ID_LEN};
