//! Test doubles for the hardware and network traits

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use latchkey_hal::{OutputPin, UartRx, UartTx};

use crate::config::Endpoint;
use crate::traits::NetLink;

/// Output pin that remembers its level
#[derive(Debug, Default)]
pub struct MockPin {
    high: bool,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Reader serial line fed from a byte queue
#[derive(Debug, Default)]
pub struct MockReader {
    pending: VecDeque<u8>,
    fail_next: bool,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the reader had sent them
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Make the next read return an error
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl UartRx for MockReader {
    type Error = ();

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        if self.fail_next {
            self.fail_next = false;
            return Err(());
        }
        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

/// Host console capturing everything written
#[derive(Debug, Default)]
pub struct MockHost {
    written: Vec<u8>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete CRLF-terminated lines written so far
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .split_terminator("\r\n")
            .map(String::from)
            .collect()
    }
}

impl UartTx for MockHost {
    type Error = ();

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), ()> {
        self.written.extend_from_slice(data);
        Ok(())
    }
}

/// Mock link errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockLinkError {
    Refused,
    NotConnected,
    Closed,
}

/// Scripted authorization server
///
/// Each successful `open` pops the next scripted response (empty if none
/// is left) and starts a new entry in the sent-bytes log.
#[derive(Debug)]
pub struct MockLink {
    reachable: bool,
    ready: bool,
    responses: VecDeque<Vec<u8>>,
    rx: VecDeque<u8>,
    chunk_size: usize,
    hang_up_when_drained: bool,
    open: bool,
    sessions: Vec<Vec<u8>>,
    last_endpoint: Option<Endpoint>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            reachable: true,
            ready: true,
            responses: VecDeque::new(),
            rx: VecDeque::new(),
            chunk_size: usize::MAX,
            hang_up_when_drained: false,
            open: false,
            sessions: Vec::new(),
            last_endpoint: None,
        }
    }

    /// Queue the server's response for a future session
    pub fn script(&mut self, response: &[u8]) {
        self.responses.push_back(response.to_vec());
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Pretend the transport is backed up
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Limit how many bytes a single `try_recv` returns
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Report the connection closed once the response is consumed
    pub fn set_hang_up_when_drained(&mut self, hang_up: bool) {
        self.hang_up_when_drained = hang_up;
    }

    /// Bytes sent during each session, oldest first
    pub fn sessions(&self) -> &[Vec<u8>] {
        &self.sessions
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.last_endpoint
    }
}

impl NetLink for MockLink {
    type Error = MockLinkError;

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn open(&mut self, endpoint: &Endpoint) -> Result<(), MockLinkError> {
        self.last_endpoint = Some(*endpoint);
        if !self.reachable {
            return Err(MockLinkError::Refused);
        }
        self.open = true;
        self.rx = self.responses.pop_front().unwrap_or_default().into();
        self.sessions.push(Vec::new());
        Ok(())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), MockLinkError> {
        match self.sessions.last_mut() {
            Some(log) if self.open => {
                log.extend_from_slice(data);
                Ok(())
            }
            _ => Err(MockLinkError::NotConnected),
        }
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> Result<usize, MockLinkError> {
        if !self.open {
            return Err(MockLinkError::NotConnected);
        }
        if self.rx.is_empty() {
            return if self.hang_up_when_drained {
                Err(MockLinkError::Closed)
            } else {
                Ok(0)
            };
        }
        let n = buf.len().min(self.chunk_size).min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.open = false;
        self.rx.clear();
    }
}
