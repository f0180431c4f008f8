//! Sync session state machine
//!
//! Session progress is a pure function of the current state and an event.
//! The client drives it; nothing here touches the link.

/// Sync session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncState {
    /// No session in progress
    #[default]
    Idle,
    /// Opening a connection to the server
    Connecting,
    /// Connection open, nothing sent yet
    Connected,
    /// Writing the request
    Sending,
    /// Heartbeat sent, waiting for the response byte
    AwaitingAck,
    /// Reload marker received, collecting the payload
    ReloadTransfer,
    /// The connection could not be opened
    ConnectFailed,
    /// Connection closed, waiting for reset
    Closed,
}

/// Events that move a session forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncEvent {
    /// A request was accepted
    Begin,
    /// The link reported the connection open
    Opened,
    /// The link could not connect
    OpenFailed,
    /// Request bytes handed to the link
    Transmit,
    /// Request was a heartbeat; a response is expected
    AwaitAck,
    /// Response byte was the reload marker
    ReloadMarker,
    /// All payload bytes arrived
    TransferComplete,
    /// Session over, connection closed
    Close,
    /// Ready for the next request
    Reset,
}

impl SyncState {
    /// Check if a new session can start
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Idle)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: SyncEvent) -> Self {
        use SyncEvent::*;
        use SyncState::*;

        match (self, event) {
            (Idle, Begin) => Connecting,

            (Connecting, Opened) => Connected,
            (Connecting, OpenFailed) => ConnectFailed,

            (Connected, Transmit) => Sending,

            (Sending, AwaitAck) => AwaitingAck,

            (AwaitingAck, ReloadMarker) => ReloadTransfer,

            (ReloadTransfer, TransferComplete) => Closed,

            // Any live session can be torn down
            (Idle, Close) => Idle,
            (_, Close) => Closed,

            (Closed, Reset) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}
