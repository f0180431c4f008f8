//! Adapters between the synchronous controller and the async tasks
//!
//! The core controller only knows the `latchkey-hal` UART traits and the
//! `NetLink` trait. These types implement them on top of the static
//! channels, so the controller never awaits anything.

use core::convert::Infallible;

use defmt::*;
use embassy_rp::uart::{BufferedUartTx, Error as UartError};
use embedded_io::Write;
use heapless::Vec;

use latchkey_core::config::Endpoint;
use latchkey_core::NetLink;
use latchkey_hal::{UartRx, UartTx};

use crate::channels::{
    NetCommand, NetEvent, SessionId, NET_CHUNK_LEN, NET_CMD, NET_EVENT, READER_BYTES, SESSION_COMMANDS,
};

/// Reader bytes forwarded by the reader RX task
pub struct ChannelReader;

impl UartRx for ChannelReader {
    type Error = Infallible;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match READER_BYTES.try_receive() {
                Ok(byte) => {
                    *slot = byte;
                    n += 1;
                }
                Err(_) => break,
            }
        }
        Ok(n)
    }
}

/// Host console on a buffered UART
pub struct HostConsole {
    tx: BufferedUartTx,
}

impl HostConsole {
    pub fn new(tx: BufferedUartTx) -> Self {
        Self { tx }
    }
}

impl UartTx for HostConsole {
    type Error = UartError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), UartError> {
        self.tx.write_all(data)
    }
}

/// Link errors seen by the sync client
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LinkError {
    /// The network task has not taken the previous command yet
    Busy,
    /// No session is open
    NotOpen,
    /// Connect or I/O failure reported by the network task
    Failed,
    /// Message longer than a command can carry
    TooLong,
}

/// `NetLink` backed by the network session task
///
/// Connection setup happens asynchronously: `open` only queues the
/// request, so connect time counts against the session's response wait.
/// While the network task is still working through earlier sessions the
/// link reports itself not ready and the controller keeps its request.
pub struct ChannelLink {
    session: SessionId,
    open: bool,
    pending: Vec<u8, NET_CHUNK_LEN>,
    offset: usize,
}

impl Default for ChannelLink {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelLink {
    pub const fn new() -> Self {
        Self {
            session: 0,
            open: false,
            pending: Vec::new(),
            offset: 0,
        }
    }

    fn command(&self, cmd: NetCommand) -> Result<(), LinkError> {
        NET_CMD.try_send(cmd).map_err(|_| LinkError::Busy)
    }

    /// Copy out bytes left over from an earlier chunk
    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let rest = &self.pending[self.offset..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.offset += n;
        if self.offset >= self.pending.len() {
            self.pending.clear();
            self.offset = 0;
        }
        n
    }
}

impl NetLink for ChannelLink {
    type Error = LinkError;

    /// A session only starts once all of its commands fit in the queue,
    /// so its close can never be dropped
    fn is_ready(&self) -> bool {
        NET_CMD.free_capacity() >= SESSION_COMMANDS
    }

    fn open(&mut self, endpoint: &Endpoint) -> Result<(), LinkError> {
        // Anything still queued belongs to an older session
        while NET_EVENT.try_receive().is_ok() {}
        self.pending.clear();
        self.offset = 0;

        self.session = self.session.wrapping_add(1);
        self.command(NetCommand::Open {
            session: self.session,
            endpoint: *endpoint,
        })?;
        self.open = true;
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::NotOpen);
        }
        let data = Vec::from_slice(data).map_err(|_| LinkError::TooLong)?;
        self.command(NetCommand::Send {
            session: self.session,
            data,
        })
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if !self.open {
            return Err(LinkError::NotOpen);
        }

        let mut n = self.drain_pending(buf);
        while n < buf.len() {
            let Ok(event) = NET_EVENT.try_receive() else {
                break;
            };
            if event.session() != self.session {
                continue;
            }
            match event {
                NetEvent::Connected { .. } => {}
                NetEvent::Data { data, .. } => {
                    self.pending = data;
                    self.offset = 0;
                    n += self.drain_pending(&mut buf[n..]);
                }
                NetEvent::Failed { .. } => {
                    self.open = false;
                    return Err(LinkError::Failed);
                }
                // Orderly close; the session decides what a short reply means
                NetEvent::Closed { .. } => break,
            }
        }
        Ok(n)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            if self.command(NetCommand::Close { session: self.session }).is_err() {
                warn!("Net command queue full, close for session {} dropped", self.session);
            }
        }
        self.pending.clear();
        self.offset = 0;
    }
}
