//! Controller task
//!
//! Runs the door controller's poll loop on a fixed tick and logs every
//! event it reports.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use latchkey_core::{Controller, ControllerEvent, SyncOutcome, TriggerOutcome};
use latchkey_hal_rp2040::RpOutput;
use latchkey_protocol::FrameError;

use crate::links::{ChannelLink, ChannelReader, HostConsole};

/// Poll interval in milliseconds
pub const POLL_INTERVAL_MS: u64 = 10;

/// The controller as wired on this board
pub type DoorController =
    Controller<ChannelReader, HostConsole, ChannelLink, RpOutput<'static>, RpOutput<'static>>;

/// Controller task - polls the controller and logs its events
#[embassy_executor::task]
pub async fn controller_task(controller: &'static mut DoorController) {
    info!(
        "Controller task started, {} allow-list slots",
        controller.allow_list().capacity()
    );

    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));
    let start = Instant::now();

    loop {
        ticker.next().await;

        // Wraps after ~49 days; the core uses wrapping arithmetic
        let now_ms = start.elapsed().as_millis() as u32;

        for event in controller.poll(now_ms) {
            log_event(&event);
        }
    }
}

fn log_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::Scan { event, unlock } => match unlock {
            Some(TriggerOutcome::Started) => info!("Tag {:?} allowed, door unlocked", event.id),
            Some(TriggerOutcome::AlreadyActive) => {
                info!("Tag {:?} allowed, door already unlocked", event.id)
            }
            None => info!("Tag {:?} denied", event.id),
        },
        ControllerEvent::FrameRejected(err @ FrameError::Truncated { .. }) => {
            debug!("Reader frame dropped: {:?}", err)
        }
        ControllerEvent::FrameRejected(err) => warn!("Reader frame rejected: {:?}", err),
        ControllerEvent::ReaderFault => warn!("Reader UART fault"),
        ControllerEvent::UnlockEnded => debug!("Door locked"),
        ControllerEvent::HeartbeatDue(hb) => debug!("Heartbeat due: {:?}", hb),
        ControllerEvent::SyncCompleted(SyncOutcome::Reloaded { entries }) => {
            info!("Allow-list reloaded, {} entries", entries)
        }
        ControllerEvent::SyncCompleted(SyncOutcome::Failed(err)) => {
            warn!("Server session failed: {:?}", err)
        }
        ControllerEvent::SyncCompleted(outcome) => trace!("Server session: {:?}", outcome),
        ControllerEvent::ReportDropped(scan) => {
            warn!("Report queue full, scan of {:?} not reported", scan.id)
        }
        ControllerEvent::LinkLost => warn!("Server link lost"),
        ControllerEvent::LinkRestored => info!("Server link restored"),
    }
}
