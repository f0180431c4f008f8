//! Controller events
//!
//! Everything the controller does in a `poll()` pass is reported as a
//! [`ControllerEvent`]. The core never logs; the firmware decides what to
//! do with each event.

use latchkey_protocol::{FrameError, HostLine, ServerMessage, TagFrame, TagId, TAG_HEX_LEN};

use crate::actuator::TriggerOutcome;
use crate::sync::SyncOutcome;

/// A checksum-valid scan and its lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanEvent {
    /// Identifier characters as received from the reader
    pub raw: [u8; TAG_HEX_LEN],
    /// Decoded identifier
    pub id: TagId,
    /// Whether the identifier is on the allow-list
    pub matched: bool,
}

impl ScanEvent {
    /// Build a scan event from a decoded frame
    pub fn from_frame(frame: &TagFrame, matched: bool) -> Self {
        Self {
            raw: *frame.raw(),
            id: frame.id(),
            matched,
        }
    }

    /// Report sent to the authorization server
    pub fn to_server_message(&self) -> ServerMessage {
        ServerMessage::ScanReport {
            raw: self.raw,
            matched: self.matched,
        }
    }

    /// Line written to the host console
    pub fn to_host_line(&self) -> HostLine {
        HostLine::Scan {
            raw: self.raw,
            matched: self.matched,
        }
    }
}

/// What a heartbeat asks of the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeartbeatKind {
    /// Startup request for the full allow-list
    ReloadRequest,
    /// Periodic uptime report
    TimestampReport,
}

/// A heartbeat to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeartbeatEvent {
    /// Milliseconds since boot when the heartbeat fell due
    pub timestamp_ms: u32,
    pub kind: HeartbeatKind,
}

impl HeartbeatEvent {
    /// Startup reload request
    pub const fn reload_request(timestamp_ms: u32) -> Self {
        Self {
            timestamp_ms,
            kind: HeartbeatKind::ReloadRequest,
        }
    }

    /// Periodic timestamp report
    pub const fn timestamp(timestamp_ms: u32) -> Self {
        Self {
            timestamp_ms,
            kind: HeartbeatKind::TimestampReport,
        }
    }

    /// Message sent to the authorization server
    pub fn to_server_message(&self) -> ServerMessage {
        match self.kind {
            HeartbeatKind::ReloadRequest => ServerMessage::ReloadRequest,
            HeartbeatKind::TimestampReport => ServerMessage::Timestamp {
                ms: self.timestamp_ms,
            },
        }
    }

    /// Host console line; the startup reload request has none
    pub fn to_host_line(&self) -> Option<HostLine> {
        match self.kind {
            HeartbeatKind::ReloadRequest => None,
            HeartbeatKind::TimestampReport => Some(HostLine::Heartbeat {
                ms: self.timestamp_ms,
            }),
        }
    }
}

/// Something that happened during a controller poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerEvent {
    /// A tag was scanned; `unlock` is set when it matched
    Scan {
        event: ScanEvent,
        unlock: Option<TriggerOutcome>,
    },
    /// A started frame was dropped
    FrameRejected(FrameError),
    /// The reader transport returned an error
    ReaderFault,
    /// The unlock period ended and the outputs were released
    UnlockEnded,
    /// A heartbeat fell due and is queued for the server
    HeartbeatDue(HeartbeatEvent),
    /// A server session finished
    SyncCompleted(SyncOutcome),
    /// The report queue was full; this report will not reach the server
    ReportDropped(ScanEvent),
    /// Too many consecutive sessions failed
    LinkLost,
    /// A session succeeded after the link was lost
    LinkRestored,
}
