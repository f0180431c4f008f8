//! Door strike and indicator actuator
//!
//! Drives both outputs active for a fixed unlock period. The period is
//! tracked against caller-supplied timestamps, so nothing here blocks.

use latchkey_hal::{ActiveLevel, OutputPin};

/// Result of an unlock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerOutcome {
    /// Outputs driven active, unlock period started
    Started,
    /// An unlock period was already running and is left unchanged
    AlreadyActive,
}

/// Strike and indicator pair with an unlock timer
pub struct Actuator<I, S> {
    indicator: ActiveLevel<I>,
    strike: ActiveLevel<S>,
    unlock_duration_ms: u32,
    /// Start of the running unlock period
    started_at: Option<u32>,
}

impl<I: OutputPin, S: OutputPin> Actuator<I, S> {
    /// Take ownership of both outputs and drive them inactive
    pub fn new(indicator: ActiveLevel<I>, strike: ActiveLevel<S>, unlock_duration_ms: u32) -> Self {
        let mut actuator = Self {
            indicator,
            strike,
            unlock_duration_ms,
            started_at: None,
        };
        actuator.drive(false);
        actuator
    }

    /// Start an unlock period
    pub fn trigger(&mut self, now_ms: u32) -> TriggerOutcome {
        if self.started_at.is_some() {
            return TriggerOutcome::AlreadyActive;
        }
        self.drive(true);
        self.started_at = Some(now_ms);
        TriggerOutcome::Started
    }

    /// Release the outputs once the unlock period has elapsed
    ///
    /// Returns true on the call that ended the period.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        match self.started_at {
            Some(start) if now_ms.wrapping_sub(start) >= self.unlock_duration_ms => {
                self.release();
                true
            }
            _ => false,
        }
    }

    /// Drive both outputs inactive immediately
    pub fn release(&mut self) {
        self.drive(false);
        self.started_at = None;
    }

    /// Check whether an unlock period is running
    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    /// Strike output
    pub fn strike(&self) -> &ActiveLevel<S> {
        &self.strike
    }

    /// Indicator output
    pub fn indicator(&self) -> &ActiveLevel<I> {
        &self.indicator
    }

    fn drive(&mut self, active: bool) {
        self.indicator.set_active(active);
        self.strike.set_active(active);
    }
}
