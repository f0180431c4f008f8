//! Door controller
//!
//! Owns every piece of controller state and advances all of it from a
//! single non-blocking [`Controller::poll`]. Each pass:
//!
//! 1. Releases the strike if the unlock period is over
//! 2. Advances an in-flight server session
//! 3. Reads the tag reader until one frame completes, or, if no tag was
//!    scanned, checks whether a heartbeat is due
//! 4. Starts the next server session if the client is idle

use heapless::{Deque, Vec};
use latchkey_hal::{ActiveLevel, OutputPin, UartRx, UartTx};
use latchkey_protocol::{TagFrame, TagFrameParser};

use crate::actuator::Actuator;
use crate::allowlist::AllowList;
use crate::config::ControllerConfig;
use crate::events::{ControllerEvent, HeartbeatEvent, ScanEvent};
use crate::health::{LinkMonitor, LinkTransition};
use crate::sync::{SyncClient, SyncOutcome, SyncRequest};
use crate::traits::NetLink;

/// Upper bound on reader bytes consumed in one poll
pub const MAX_READER_BYTES_PER_POLL: usize = 32;

/// Scan reports waiting for the server
pub const REPORT_QUEUE_LEN: usize = 4;

/// Upper bound on events produced by one poll
pub const MAX_POLL_EVENTS: usize = 8;

/// Events produced by one poll
pub type PollEvents = Vec<ControllerEvent, MAX_POLL_EVENTS>;

/// The door controller
pub struct Controller<R, H, L, I, S> {
    config: ControllerConfig,
    reader: R,
    host: H,
    parser: TagFrameParser,
    allow_list: AllowList,
    actuator: Actuator<I, S>,
    sync: SyncClient<L>,
    monitor: LinkMonitor,
    reports: Deque<ScanEvent, REPORT_QUEUE_LEN>,
    pending_heartbeat: Option<HeartbeatEvent>,
    /// None until the startup reload request has fallen due
    last_heartbeat_ms: Option<u32>,
    reader_faults: u32,
    dropped_reports: u32,
}

impl<R, H, L, I, S> Controller<R, H, L, I, S>
where
    R: UartRx,
    H: UartTx,
    L: NetLink,
    I: OutputPin,
    S: OutputPin,
{
    /// Build the controller; both outputs are driven inactive
    pub fn new(config: ControllerConfig, reader: R, host: H, link: L, indicator: I, strike: S) -> Self {
        let actuator = Actuator::new(
            ActiveLevel::new(indicator, config.outputs.indicator.inverted),
            ActiveLevel::new(strike, config.outputs.strike.inverted),
            config.timing.unlock_duration_ms,
        );
        let sync = SyncClient::new(link, config.network.server, &config.timing);

        Self {
            config,
            reader,
            host,
            parser: TagFrameParser::new(),
            allow_list: AllowList::new(),
            actuator,
            sync,
            monitor: LinkMonitor::new(),
            reports: Deque::new(),
            pending_heartbeat: None,
            last_heartbeat_ms: None,
            reader_faults: 0,
            dropped_reports: 0,
        }
    }

    /// Run one pass of the control loop
    pub fn poll(&mut self, now_ms: u32) -> PollEvents {
        let mut events = PollEvents::new();

        if self.actuator.poll(now_ms) {
            push(&mut events, ControllerEvent::UnlockEnded);
        }

        if let Some(outcome) = self.sync.poll(now_ms, &mut self.allow_list) {
            self.session_finished(outcome, now_ms, &mut events);
        }

        if !self.service_reader(now_ms, &mut events) {
            self.check_heartbeat(now_ms, &mut events);
        }

        self.start_session(now_ms, &mut events);

        events
    }

    /// Read until one frame completes. Returns true if a tag was scanned.
    fn service_reader(&mut self, now_ms: u32, events: &mut PollEvents) -> bool {
        for _ in 0..MAX_READER_BYTES_PER_POLL {
            let byte = match self.reader.try_read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => break,
                Err(_) => {
                    self.reader_faults = self.reader_faults.wrapping_add(1);
                    push(events, ControllerEvent::ReaderFault);
                    break;
                }
            };

            match self.parser.feed(byte) {
                Ok(Some(frame)) => {
                    self.handle_frame(&frame, now_ms, events);
                    return true;
                }
                Ok(None) => {}
                Err(err) => {
                    push(events, ControllerEvent::FrameRejected(err));
                    break;
                }
            }
        }
        false
    }

    fn handle_frame(&mut self, frame: &TagFrame, now_ms: u32, events: &mut PollEvents) {
        let matched = self.allow_list.lookup(&frame.id());
        let unlock = matched.then(|| self.actuator.trigger(now_ms));
        let scan = ScanEvent::from_frame(frame, matched);

        // Console write errors never hold up the door
        let _ = self.host.write_blocking(&scan.to_host_line().encode());

        if self.reports.push_back(scan).is_err() {
            self.dropped_reports = self.dropped_reports.wrapping_add(1);
            push(events, ControllerEvent::ReportDropped(scan));
        }
        push(events, ControllerEvent::Scan { event: scan, unlock });
    }

    fn check_heartbeat(&mut self, now_ms: u32, events: &mut PollEvents) {
        if self.pending_heartbeat.is_some() {
            return;
        }

        let beat = match self.last_heartbeat_ms {
            None => HeartbeatEvent::reload_request(now_ms),
            Some(last) if now_ms.wrapping_sub(last) >= self.config.timing.heartbeat_interval_ms => {
                HeartbeatEvent::timestamp(now_ms)
            }
            Some(_) => return,
        };
        self.last_heartbeat_ms = Some(now_ms);

        if let Some(line) = beat.to_host_line() {
            let _ = self.host.write_blocking(&line.encode());
        }
        self.pending_heartbeat = Some(beat);
        push(events, ControllerEvent::HeartbeatDue(beat));
    }

    fn start_session(&mut self, now_ms: u32, events: &mut PollEvents) {
        if !self.sync.is_idle() {
            return;
        }

        // Heartbeats go first so a reload is never starved by scans
        let request = if let Some(beat) = self.pending_heartbeat.take() {
            SyncRequest::Heartbeat(beat)
        } else if let Some(scan) = self.reports.pop_front() {
            SyncRequest::Report(scan)
        } else {
            return;
        };

        match self.sync.begin(request, now_ms) {
            Ok(Some(outcome)) => self.session_finished(outcome, now_ms, events),
            Ok(None) => {}
            Err(_) => self.requeue(request),
        }
    }

    fn requeue(&mut self, request: SyncRequest) {
        match request {
            SyncRequest::Heartbeat(beat) => self.pending_heartbeat = Some(beat),
            SyncRequest::Report(scan) => {
                // The slot was freed by the pop above
                let _ = self.reports.push_front(scan);
            }
        }
    }

    fn session_finished(&mut self, outcome: SyncOutcome, now_ms: u32, events: &mut PollEvents) {
        let transition = self.monitor.record(&outcome, now_ms);
        push(events, ControllerEvent::SyncCompleted(outcome));
        match transition {
            Some(LinkTransition::Lost) => push(events, ControllerEvent::LinkLost),
            Some(LinkTransition::Restored) => push(events, ControllerEvent::LinkRestored),
            None => {}
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Live allow-list
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Strike and indicator
    pub fn actuator(&self) -> &Actuator<I, S> {
        &self.actuator
    }

    /// Server sync client
    pub fn sync(&self) -> &SyncClient<L> {
        &self.sync
    }

    /// Link health
    pub fn monitor(&self) -> &LinkMonitor {
        &self.monitor
    }

    /// Reader transport
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Mutable access to the reader transport
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Host console
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the server link
    pub fn link_mut(&mut self) -> &mut L {
        self.sync.link_mut()
    }

    /// Scan reports waiting for the server
    pub fn pending_reports(&self) -> usize {
        self.reports.len()
    }

    /// Reports dropped because the queue was full
    pub fn dropped_reports(&self) -> u32 {
        self.dropped_reports
    }

    /// Reader transport errors seen so far
    pub fn reader_faults(&self) -> u32 {
        self.reader_faults
    }
}

fn push(events: &mut PollEvents, event: ControllerEvent) {
    // Sized for the worst case of a single pass
    let _ = events.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::RELOAD_PAYLOAD_LEN;
    use crate::mock::{MockHost, MockLink, MockPin, MockReader};
    use crate::sync::{SyncError, SyncState};
    use crate::TriggerOutcome;
    use latchkey_protocol::{encode_frame, FrameError, TagId, RELOAD_MARKER};

    type TestController = Controller<MockReader, MockHost, MockLink, MockPin, MockPin>;

    const SCENARIO_FRAME: [u8; 14] = [
        0x02, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x31, 0x30, 0x31, 0x0D,
    ];
    const SCENARIO_ID: TagId = TagId::new([0, 0, 0, 0, 1]);

    fn payload_with(ids: &[TagId]) -> [u8; RELOAD_PAYLOAD_LEN] {
        let mut payload = [0u8; RELOAD_PAYLOAD_LEN];
        for (i, id) in ids.iter().enumerate() {
            payload[i * 5..i * 5 + 5].copy_from_slice(id.as_bytes());
        }
        payload
    }

    fn reload_response(payload: &[u8; RELOAD_PAYLOAD_LEN]) -> std::vec::Vec<u8> {
        let mut response = vec![RELOAD_MARKER];
        response.extend_from_slice(payload);
        response
    }

    /// Controller whose startup reload installs `ids`
    fn booted(ids: &[TagId]) -> TestController {
        let mut link = MockLink::new();
        link.script(&reload_response(&payload_with(ids)));
        let mut ctrl = Controller::new(
            ControllerConfig::default(),
            MockReader::new(),
            MockHost::new(),
            link,
            MockPin::new(),
            MockPin::new(),
        );

        // Startup heartbeat, ack byte, payload
        ctrl.poll(0);
        ctrl.poll(1);
        let events = ctrl.poll(2);
        assert!(events.contains(&ControllerEvent::SyncCompleted(SyncOutcome::Reloaded {
            entries: ids.iter().filter(|id| !id.is_empty()).count() as u16,
        })));
        assert!(ctrl.sync().is_idle());
        ctrl
    }

    fn scans(events: &PollEvents) -> std::vec::Vec<ScanEvent> {
        events
            .iter()
            .filter_map(|event| match event {
                ControllerEvent::Scan { event, .. } => Some(*event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_startup_sends_reload_request() {
        let mut ctrl = Controller::new(
            ControllerConfig::default(),
            MockReader::new(),
            MockHost::new(),
            MockLink::new(),
            MockPin::new(),
            MockPin::new(),
        );

        let events = ctrl.poll(0);
        assert_eq!(
            events[0],
            ControllerEvent::HeartbeatDue(HeartbeatEvent::reload_request(0))
        );
        assert_eq!(ctrl.sync().state(), SyncState::AwaitingAck);
        assert_eq!(ctrl.sync().link().sessions(), &[b"R\n".to_vec()]);
        // The startup request prints nothing on the console
        assert!(ctrl.host().lines().is_empty());
        assert_eq!(
            ctrl.sync().link().last_endpoint(),
            Some(ControllerConfig::default().network.server)
        );
    }

    #[test]
    fn test_scenario_a_match_unlocks() {
        let mut ctrl = booted(&[SCENARIO_ID]);
        ctrl.reader_mut().push(&SCENARIO_FRAME);

        let events = ctrl.poll(10);
        assert!(events.contains(&ControllerEvent::Scan {
            event: ScanEvent {
                raw: *b"0000000001",
                id: SCENARIO_ID,
                matched: true,
            },
            unlock: Some(TriggerOutcome::Started),
        }));
        assert!(ctrl.actuator().is_active());
        assert!(ctrl.actuator().strike().is_active());
        assert_eq!(ctrl.host().lines(), ["0000000001 - Y"]);

        // Report was sent in the same pass
        assert_eq!(ctrl.sync().link().sessions()[1], b"0000000001Y\n".to_vec());
    }

    #[test]
    fn test_scenario_b_unknown_tag() {
        let mut ctrl = booted(&[]);
        ctrl.reader_mut().push(&SCENARIO_FRAME);

        let events = ctrl.poll(10);
        let scanned = scans(&events);
        assert_eq!(scanned.len(), 1);
        assert!(!scanned[0].matched);
        assert!(!ctrl.actuator().is_active());
        assert_eq!(ctrl.host().lines(), ["0000000001 - N"]);
        assert_eq!(ctrl.sync().link().sessions()[1], b"0000000001N\n".to_vec());
    }

    #[test]
    fn test_scenario_c_heartbeat_reload() {
        let mut ctrl = booted(&[]);

        // 200 distinct non-zero records
        let ids: std::vec::Vec<TagId> = (1..=200u32)
            .map(|i| TagId::new([0xA0, 0, 0, (i >> 8) as u8, i as u8]))
            .collect();
        ctrl.link_mut().script(&reload_response(&payload_with(&ids)));

        assert!(ctrl.poll(299_999).is_empty());

        let events = ctrl.poll(300_000);
        assert!(events.contains(&ControllerEvent::HeartbeatDue(HeartbeatEvent::timestamp(300_000))));
        assert_eq!(ctrl.host().lines(), ["T300000"]);
        assert_eq!(ctrl.sync().link().sessions()[1], b"T300000\n".to_vec());

        ctrl.poll(300_001);
        let events = ctrl.poll(300_002);
        assert!(events.contains(&ControllerEvent::SyncCompleted(SyncOutcome::Reloaded {
            entries: 200
        })));

        for id in &ids {
            assert!(ctrl.allow_list().lookup(id));
        }
        assert!(ctrl.allow_list().is_full());
        assert!(!ctrl.allow_list().lookup(&TagId::new([0xB0, 0, 0, 0, 1])));
    }

    #[test]
    fn test_scenario_d_server_unreachable() {
        let mut ctrl = booted(&[SCENARIO_ID]);
        ctrl.link_mut().set_reachable(false);

        let events = ctrl.poll(300_000);
        assert!(events.contains(&ControllerEvent::SyncCompleted(SyncOutcome::Failed(
            SyncError::ConnectFailed
        ))));
        assert!(ctrl.sync().is_idle());
        assert!(ctrl.allow_list().lookup(&SCENARIO_ID));

        // The reader is still serviced on the next pass
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        let events = ctrl.poll(300_010);
        assert_eq!(scans(&events).len(), 1);
        assert!(ctrl.actuator().is_active());
    }

    #[test]
    fn test_eleven_bytes_then_terminator() {
        let mut ctrl = booted(&[SCENARIO_ID]);
        ctrl.reader_mut().push(&SCENARIO_FRAME[..12]);
        ctrl.reader_mut().push(&[0x0D]);

        let events = ctrl.poll(10);
        assert!(events.contains(&ControllerEvent::FrameRejected(FrameError::Truncated {
            received: 11
        })));
        assert!(scans(&events).is_empty());
        assert!(ctrl.host().lines().is_empty());
        assert_eq!(ctrl.pending_reports(), 0);

        // Ready for the next header
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        assert_eq!(scans(&ctrl.poll(20)).len(), 1);
    }

    #[test]
    fn test_unlock_does_not_block() {
        let mut ctrl = booted(&[SCENARIO_ID]);
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        ctrl.poll(100);
        assert!(ctrl.actuator().is_active());

        // Second scan while unlocked is still read and reported
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        let events = ctrl.poll(1_000);
        assert!(events.iter().any(|event| matches!(
            event,
            ControllerEvent::Scan {
                unlock: Some(TriggerOutcome::AlreadyActive),
                ..
            }
        )));

        assert!(!ctrl.poll(2_099).contains(&ControllerEvent::UnlockEnded));
        assert!(ctrl.poll(2_100).contains(&ControllerEvent::UnlockEnded));
        assert!(!ctrl.actuator().strike().is_active());
    }

    #[test]
    fn test_one_frame_per_poll() {
        let mut ctrl = booted(&[]);
        let other = encode_frame(&TagId::new([1, 2, 3, 4, 5]));
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        ctrl.reader_mut().push(&other);

        assert_eq!(scans(&ctrl.poll(10)).len(), 1);
        assert!(ctrl.reader().pending() > 0);
        let second = scans(&ctrl.poll(11));
        assert_eq!(second[0].raw, *b"0102030405");
    }

    #[test]
    fn test_scan_defers_heartbeat_to_next_pass() {
        let mut ctrl = booted(&[]);
        let interval = ctrl.config().timing.heartbeat_interval_ms;
        ctrl.reader_mut().push(&SCENARIO_FRAME);

        // Heartbeat is due, but the frame takes this pass
        let events = ctrl.poll(interval);
        assert_eq!(scans(&events).len(), 1);
        assert!(!events
            .iter()
            .any(|event| matches!(event, ControllerEvent::HeartbeatDue(_))));
        assert_eq!(ctrl.sync().link().sessions()[1], b"0000000001N\n".to_vec());

        let events = ctrl.poll(interval + 1);
        assert!(events.contains(&ControllerEvent::HeartbeatDue(HeartbeatEvent::timestamp(
            interval + 1
        ))));
        assert_eq!(ctrl.sync().link().sessions()[2], format!("T{}\n", interval + 1).into_bytes());
    }

    #[test]
    fn test_reports_wait_for_busy_link() {
        let mut ctrl = booted(&[]);
        ctrl.link_mut().set_ready(false);

        for i in 0..3u8 {
            ctrl.reader_mut().push(&encode_frame(&TagId::new([i + 1; 5])));
            let events = ctrl.poll(10 + i as u32);
            assert!(!events
                .iter()
                .any(|event| matches!(event, ControllerEvent::SyncCompleted(_))));
        }
        assert_eq!(ctrl.pending_reports(), 3);
        assert_eq!(ctrl.monitor().consecutive_failures(), 0);
        assert!(ctrl.monitor().is_link_healthy());

        // Queued reports go out in scan order once the link frees up
        ctrl.link_mut().set_ready(true);
        for t in 20..23 {
            assert!(ctrl
                .poll(t)
                .contains(&ControllerEvent::SyncCompleted(SyncOutcome::Reported)));
        }
        assert_eq!(ctrl.pending_reports(), 0);
        assert_eq!(ctrl.sync().link().sessions()[1], b"0101010101N\n".to_vec());
        assert_eq!(ctrl.sync().link().sessions()[3], b"0303030303N\n".to_vec());
    }

    #[test]
    fn test_report_queue_overflow() {
        let mut ctrl = booted(&[]);
        // Hold the client busy with a heartbeat nobody answers
        ctrl.poll(300_000);
        assert_eq!(ctrl.sync().state(), SyncState::AwaitingAck);

        for i in 0..5u8 {
            ctrl.reader_mut().push(&encode_frame(&TagId::new([i + 1; 5])));
        }
        for t in 1..=4 {
            ctrl.poll(300_000 + t);
        }
        assert_eq!(ctrl.pending_reports(), REPORT_QUEUE_LEN);

        let events = ctrl.poll(300_005);
        assert!(events
            .iter()
            .any(|event| matches!(event, ControllerEvent::ReportDropped(scan) if scan.id == TagId::new([5; 5]))));
        assert_eq!(ctrl.dropped_reports(), 1);

        // Ack window closes; the queue drains one report per pass
        ctrl.poll(300_500);
        assert_eq!(ctrl.pending_reports(), REPORT_QUEUE_LEN - 1);
        for t in 1..=3 {
            ctrl.poll(300_500 + t);
        }
        assert_eq!(ctrl.pending_reports(), 0);
        assert_eq!(ctrl.sync().link().sessions()[2], b"0101010101N\n".to_vec());
    }

    #[test]
    fn test_old_table_used_during_reload() {
        let mut ctrl = booted(&[SCENARIO_ID]);
        let mut response = reload_response(&payload_with(&[TagId::new([9; 5])]));
        response.truncate(1 + 500);
        ctrl.link_mut().script(&response);

        ctrl.poll(300_000);
        ctrl.poll(300_001);
        assert_eq!(ctrl.sync().state(), SyncState::ReloadTransfer);

        // Mid-transfer scan is checked against the old table
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        let events = ctrl.poll(300_002);
        assert!(scans(&events)[0].matched);
        assert_eq!(ctrl.sync().staged_bytes(), 500);
        assert_eq!(ctrl.pending_reports(), 1);

        // The server never sends the rest
        let events = ctrl.poll(305_001);
        assert!(events.contains(&ControllerEvent::SyncCompleted(SyncOutcome::Failed(
            SyncError::PartialReload { received: 500 }
        ))));
        assert!(ctrl.allow_list().lookup(&SCENARIO_ID));
        assert!(!ctrl.allow_list().lookup(&TagId::new([9; 5])));

        // The held-back report goes out once the session is over
        assert_eq!(ctrl.pending_reports(), 0);
    }

    #[test]
    fn test_link_lost_and_restored() {
        let mut ctrl = booted(&[]);
        ctrl.link_mut().set_reachable(false);

        let mut lost = false;
        for i in 0..3u8 {
            ctrl.reader_mut().push(&encode_frame(&TagId::new([i + 1; 5])));
            lost |= ctrl.poll(10 + i as u32).contains(&ControllerEvent::LinkLost);
        }
        assert!(lost);
        assert!(!ctrl.monitor().is_link_healthy());

        ctrl.link_mut().set_reachable(true);
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        assert!(ctrl.poll(20).contains(&ControllerEvent::LinkRestored));
    }

    #[test]
    fn test_reader_fault_is_counted() {
        let mut ctrl = booted(&[]);
        ctrl.reader_mut().fail_next();

        assert!(ctrl.poll(10).contains(&ControllerEvent::ReaderFault));
        assert_eq!(ctrl.reader_faults(), 1);
        ctrl.reader_mut().push(&SCENARIO_FRAME);
        assert_eq!(scans(&ctrl.poll(11)).len(), 1);
    }

    #[test]
    fn test_active_low_strike() {
        let mut config = ControllerConfig::default();
        config.outputs.strike.inverted = true;
        let ctrl: TestController = Controller::new(
            config,
            MockReader::new(),
            MockHost::new(),
            MockLink::new(),
            MockPin::new(),
            MockPin::new(),
        );
        assert!(ctrl.actuator().strike().pin().is_set_high());
        assert!(ctrl.actuator().indicator().pin().is_set_low());
    }
}
