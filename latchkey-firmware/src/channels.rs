//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! The controller task stays synchronous; it exchanges bytes with the
//! reader and network tasks only through non-blocking `try_*` calls.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use latchkey_core::config::Endpoint;
use latchkey_protocol::MAX_SERVER_MESSAGE_LEN;

/// Channel capacity for raw reader bytes
const READER_CHANNEL_SIZE: usize = 64;

/// Channel capacity for network commands
const NET_CMD_CHANNEL_SIZE: usize = 6;

/// Commands one session queues: open, send, close
pub const SESSION_COMMANDS: usize = 3;

/// Channel capacity for network events
const NET_EVENT_CHANNEL_SIZE: usize = 8;

/// Largest chunk of server data carried by one event
pub const NET_CHUNK_LEN: usize = 64;

/// Session number, bumped on every open so late events can be discarded
pub type SessionId = u16;

/// Requests from the controller to the network task
#[derive(Debug, Clone, defmt::Format)]
pub enum NetCommand {
    /// Connect to the server
    Open { session: SessionId, endpoint: Endpoint },
    /// Write a message on the open connection
    Send {
        session: SessionId,
        data: Vec<u8, MAX_SERVER_MESSAGE_LEN>,
    },
    /// Close the connection
    Close { session: SessionId },
}

/// Reports from the network task to the controller
#[derive(Debug, Clone, defmt::Format)]
pub enum NetEvent {
    /// Connection established
    Connected { session: SessionId },
    /// Bytes received from the server
    Data {
        session: SessionId,
        data: Vec<u8, NET_CHUNK_LEN>,
    },
    /// Connect or I/O error; the connection is gone
    Failed { session: SessionId },
    /// Server closed the connection
    Closed { session: SessionId },
}

impl NetEvent {
    pub fn session(&self) -> SessionId {
        match self {
            NetEvent::Connected { session }
            | NetEvent::Data { session, .. }
            | NetEvent::Failed { session }
            | NetEvent::Closed { session } => *session,
        }
    }
}

/// Bytes from the tag reader UART
pub static READER_BYTES: Channel<CriticalSectionRawMutex, u8, READER_CHANNEL_SIZE> =
    Channel::new();

/// Commands for the network session task
pub static NET_CMD: Channel<CriticalSectionRawMutex, NetCommand, NET_CMD_CHANNEL_SIZE> =
    Channel::new();

/// Events from the network session task
pub static NET_EVENT: Channel<CriticalSectionRawMutex, NetEvent, NET_EVENT_CHANNEL_SIZE> =
    Channel::new();
