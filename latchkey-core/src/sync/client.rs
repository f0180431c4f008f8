//! Sync session client
//!
//! Runs one session at a time over a [`NetLink`]. Opening and sending
//! happen in [`SyncClient::begin`]; waiting for the server happens across
//! later [`SyncClient::poll`] calls, each bounded by a timeout.

use latchkey_protocol::RELOAD_MARKER;

use super::state::{SyncEvent, SyncState};
use crate::allowlist::{AllowList, ReloadBuffer};
use crate::config::{Endpoint, TimingConfig};
use crate::events::{HeartbeatEvent, ScanEvent};
use crate::traits::NetLink;

/// Work for a sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncRequest {
    /// Fire-and-forget scan report
    Report(ScanEvent),
    /// Heartbeat, possibly answered with a reload
    Heartbeat(HeartbeatEvent),
}

/// Session failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncError {
    /// A session is already in progress, or the link cannot take one yet
    Busy,
    /// Could not connect to the server
    ConnectFailed,
    /// Connection dropped while sending
    SendFailed,
    /// Connection dropped while waiting for the response byte
    ReceiveFailed,
    /// Reload aborted before the payload was complete
    PartialReload {
        /// Payload bytes received before the abort
        received: u16,
    },
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncOutcome {
    /// Scan report delivered
    Reported,
    /// Heartbeat answered with something other than the reload marker
    Acknowledged,
    /// Heartbeat sent, but nothing came back in time
    NoResponse,
    /// A new allow-list was installed
    Reloaded {
        /// Non-empty slots in the new table
        entries: u16,
    },
    /// Session failed; the allow-list is unchanged
    Failed(SyncError),
}

impl SyncOutcome {
    /// Check whether the server was reached
    pub fn is_success(&self) -> bool {
        !matches!(self, SyncOutcome::Failed(_))
    }
}

/// Client for the authorization server
pub struct SyncClient<L> {
    link: L,
    server: Endpoint,
    ack_wait_ms: u32,
    reload_timeout_ms: u32,
    state: SyncState,
    /// When the current wait (ack or reload) began
    wait_started_ms: u32,
    staging: ReloadBuffer,
}

impl<L: NetLink> SyncClient<L> {
    /// Create a client talking to `server` over `link`
    pub fn new(link: L, server: Endpoint, timing: &TimingConfig) -> Self {
        Self {
            link,
            server,
            ack_wait_ms: timing.ack_wait_ms,
            reload_timeout_ms: timing.reload_timeout_ms,
            state: SyncState::Idle,
            wait_started_ms: 0,
            staging: ReloadBuffer::new(),
        }
    }

    /// Current session state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Check if a new session can start
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Bytes staged for an in-flight reload
    pub fn staged_bytes(&self) -> usize {
        self.staging.filled()
    }

    /// Access the underlying link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable access to the underlying link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Start a session
    ///
    /// Returns `Err(Busy)` if a session is in progress or the link is not
    /// ready; the request is not taken. Otherwise returns the outcome if the session already ended
    /// (reports and connect failures), or `None` while a heartbeat waits for
    /// its response.
    pub fn begin(&mut self, request: SyncRequest, now_ms: u32) -> Result<Option<SyncOutcome>, SyncError> {
        if !self.state.is_idle() || !self.link.is_ready() {
            return Err(SyncError::Busy);
        }
        self.advance(SyncEvent::Begin);

        if self.link.open(&self.server).is_err() {
            self.advance(SyncEvent::OpenFailed);
            return Ok(Some(self.finish(SyncOutcome::Failed(SyncError::ConnectFailed))));
        }
        self.advance(SyncEvent::Opened);

        let message = match request {
            SyncRequest::Report(scan) => scan.to_server_message(),
            SyncRequest::Heartbeat(beat) => beat.to_server_message(),
        };
        self.advance(SyncEvent::Transmit);
        if self.link.send(&message.encode()).is_err() {
            return Ok(Some(self.finish(SyncOutcome::Failed(SyncError::SendFailed))));
        }

        match request {
            SyncRequest::Report(_) => Ok(Some(self.finish(SyncOutcome::Reported))),
            SyncRequest::Heartbeat(_) => {
                self.advance(SyncEvent::AwaitAck);
                self.wait_started_ms = now_ms;
                Ok(None)
            }
        }
    }

    /// Advance a session that is waiting on the server
    ///
    /// `allow_list` is replaced only when a reload payload is complete.
    pub fn poll(&mut self, now_ms: u32, allow_list: &mut AllowList) -> Option<SyncOutcome> {
        match self.state {
            SyncState::AwaitingAck => self.poll_ack(now_ms),
            SyncState::ReloadTransfer => self.poll_reload(now_ms, allow_list),
            _ => None,
        }
    }

    fn poll_ack(&mut self, now_ms: u32) -> Option<SyncOutcome> {
        let mut response = [0u8; 1];
        match self.link.try_recv(&mut response) {
            Ok(0) => {
                if now_ms.wrapping_sub(self.wait_started_ms) >= self.ack_wait_ms {
                    Some(self.finish(SyncOutcome::NoResponse))
                } else {
                    None
                }
            }
            Ok(_) if response[0] == RELOAD_MARKER => {
                self.advance(SyncEvent::ReloadMarker);
                self.staging.clear();
                self.wait_started_ms = now_ms;
                None
            }
            Ok(_) => Some(self.finish(SyncOutcome::Acknowledged)),
            Err(_) => Some(self.finish(SyncOutcome::Failed(SyncError::ReceiveFailed))),
        }
    }

    fn poll_reload(&mut self, now_ms: u32, allow_list: &mut AllowList) -> Option<SyncOutcome> {
        loop {
            match self.link.try_recv(self.staging.remaining_mut()) {
                Ok(0) => break,
                Ok(n) => {
                    self.staging.advance(n);
                    if let Some(payload) = self.staging.as_payload() {
                        allow_list.replace(payload);
                        self.advance(SyncEvent::TransferComplete);
                        let entries = allow_list.len() as u16;
                        return Some(self.finish(SyncOutcome::Reloaded { entries }));
                    }
                }
                Err(_) => return Some(self.abort_reload()),
            }
        }

        if now_ms.wrapping_sub(self.wait_started_ms) >= self.reload_timeout_ms {
            return Some(self.abort_reload());
        }
        None
    }

    fn abort_reload(&mut self) -> SyncOutcome {
        let received = self.staging.filled() as u16;
        self.staging.clear();
        self.finish(SyncOutcome::Failed(SyncError::PartialReload { received }))
    }

    fn finish(&mut self, outcome: SyncOutcome) -> SyncOutcome {
        self.link.close();
        self.advance(SyncEvent::Close);
        self.advance(SyncEvent::Reset);
        outcome
    }

    fn advance(&mut self, event: SyncEvent) {
        self.state = self.state.transition(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::RELOAD_PAYLOAD_LEN;
    use crate::mock::MockLink;
    use latchkey_protocol::TagId;

    fn client(link: MockLink) -> SyncClient<MockLink> {
        SyncClient::new(
            link,
            Endpoint::new([192, 168, 1, 100], 9999),
            &TimingConfig::default(),
        )
    }

    fn scan(matched: bool) -> ScanEvent {
        ScanEvent {
            raw: *b"0000000001",
            id: TagId::new([0, 0, 0, 0, 1]),
            matched,
        }
    }

    fn reload_response(records: u8) -> Vec<u8> {
        let mut response = vec![RELOAD_MARKER];
        let mut payload = [0u8; RELOAD_PAYLOAD_LEN];
        for i in 0..records as usize {
            payload[i * 5..i * 5 + 5].copy_from_slice(&[i as u8 + 1; 5]);
        }
        response.extend_from_slice(&payload);
        response
    }

    #[test]
    fn test_report_is_fire_and_forget() {
        let mut sync = client(MockLink::new());
        let outcome = sync.begin(SyncRequest::Report(scan(false)), 0);

        assert_eq!(outcome, Ok(Some(SyncOutcome::Reported)));
        assert!(sync.is_idle());
        assert_eq!(sync.link().sessions(), &[b"0000000001N\n".to_vec()]);
        assert!(!sync.link().is_open());
    }

    #[test]
    fn test_connect_failure() {
        let mut link = MockLink::new();
        link.set_reachable(false);
        let mut sync = client(link);

        let outcome = sync.begin(SyncRequest::Heartbeat(HeartbeatEvent::timestamp(1)), 0);
        assert_eq!(
            outcome,
            Ok(Some(SyncOutcome::Failed(SyncError::ConnectFailed)))
        );
        assert!(sync.is_idle());
    }

    #[test]
    fn test_busy_while_waiting() {
        let mut sync = client(MockLink::new());
        assert_eq!(
            sync.begin(SyncRequest::Heartbeat(HeartbeatEvent::reload_request(0)), 0),
            Ok(None)
        );
        assert_eq!(sync.state(), SyncState::AwaitingAck);
        assert_eq!(
            sync.begin(SyncRequest::Report(scan(true)), 10),
            Err(SyncError::Busy)
        );
    }

    #[test]
    fn test_link_not_ready_keeps_request() {
        let mut link = MockLink::new();
        link.set_ready(false);
        let mut sync = client(link);

        assert_eq!(
            sync.begin(SyncRequest::Report(scan(true)), 0),
            Err(SyncError::Busy)
        );
        assert!(sync.is_idle());
        assert!(sync.link().sessions().is_empty());

        sync.link_mut().set_ready(true);
        assert_eq!(
            sync.begin(SyncRequest::Report(scan(true)), 10),
            Ok(Some(SyncOutcome::Reported))
        );
        assert_eq!(sync.link().sessions(), &[b"0000000001Y\n".to_vec()]);
    }

    #[test]
    fn test_ack_timeout() {
        let mut sync = client(MockLink::new());
        let mut list = AllowList::new();
        sync.begin(SyncRequest::Heartbeat(HeartbeatEvent::timestamp(1000)), 1000)
            .unwrap();

        assert_eq!(sync.poll(1499, &mut list), None);
        assert_eq!(sync.poll(1500, &mut list), Some(SyncOutcome::NoResponse));
        assert!(sync.is_idle());
        assert_eq!(sync.link().sessions(), &[b"T1000\n".to_vec()]);
    }

    #[test]
    fn test_non_marker_response() {
        let mut link = MockLink::new();
        link.script(b"K");
        let mut sync = client(link);
        let mut list = AllowList::new();

        sync.begin(SyncRequest::Heartbeat(HeartbeatEvent::timestamp(5)), 5)
            .unwrap();
        assert_eq!(sync.poll(6, &mut list), Some(SyncOutcome::Acknowledged));
    }

    #[test]
    fn test_reload_installs_table() {
        let mut link = MockLink::new();
        link.script(&reload_response(3));
        link.set_chunk_size(64);
        let mut sync = client(link);
        let mut list = AllowList::new();

        sync.begin(SyncRequest::Heartbeat(HeartbeatEvent::reload_request(0)), 0)
            .unwrap();
        assert_eq!(sync.poll(1, &mut list), None);
        assert_eq!(sync.state(), SyncState::ReloadTransfer);

        assert_eq!(sync.poll(2, &mut list), Some(SyncOutcome::Reloaded { entries: 3 }));
        assert!(list.lookup(&TagId::new([3; 5])));
        assert!(!list.lookup(&TagId::new([4; 5])));
        assert!(sync.is_idle());
    }

    #[test]
    fn test_reload_hangup_keeps_table() {
        let mut response = reload_response(1);
        response.truncate(1 + 600);
        let mut link = MockLink::new();
        link.script(&response);
        link.set_hang_up_when_drained(true);
        let mut sync = client(link);

        let mut list = AllowList::new();
        list.replace(&[7u8; RELOAD_PAYLOAD_LEN]);

        sync.begin(SyncRequest::Heartbeat(HeartbeatEvent::reload_request(0)), 0)
            .unwrap();
        sync.poll(1, &mut list);
        assert_eq!(
            sync.poll(2, &mut list),
            Some(SyncOutcome::Failed(SyncError::PartialReload { received: 600 }))
        );
        assert!(list.lookup(&TagId::new([7; 5])));
        assert!(!list.lookup(&TagId::new([1; 5])));
        assert_eq!(sync.staged_bytes(), 0);
    }

    #[test]
    fn test_reload_timeout() {
        let mut response = reload_response(1);
        response.truncate(1 + 10);
        let mut link = MockLink::new();
        link.script(&response);
        let mut sync = client(link);
        let mut list = AllowList::new();

        sync.begin(SyncRequest::Heartbeat(HeartbeatEvent::reload_request(0)), 0)
            .unwrap();
        sync.poll(100, &mut list);
        assert_eq!(sync.poll(5099, &mut list), None);
        assert_eq!(sync.staged_bytes(), 10);
        assert_eq!(
            sync.poll(5100, &mut list),
            Some(SyncOutcome::Failed(SyncError::PartialReload { received: 10 }))
        );
        assert!(list.is_empty());
    }
}
