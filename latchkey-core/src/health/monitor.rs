//! Link health monitor implementation

use crate::sync::SyncOutcome;

/// Consecutive failed sessions before the link counts as lost
pub const MAX_FAILED_SESSIONS: u8 = 3;

/// Change in link health caused by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkTransition {
    /// Failure count just reached the limit
    Lost,
    /// First success after the link was lost
    Restored,
}

/// Counts consecutive failed sync sessions
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    /// Failed sessions since the last success
    consecutive_failures: u8,
    /// Time of the last successful session
    last_success_ms: Option<u32>,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMonitor {
    /// Create a new monitor; the link starts out healthy
    pub const fn new() -> Self {
        Self {
            consecutive_failures: 0,
            last_success_ms: None,
        }
    }

    /// Record the outcome of a finished session
    ///
    /// Returns a transition when the link health changed.
    pub fn record(&mut self, outcome: &SyncOutcome, now_ms: u32) -> Option<LinkTransition> {
        let was_healthy = self.is_link_healthy();

        if outcome.is_success() {
            self.consecutive_failures = 0;
            self.last_success_ms = Some(now_ms);
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        match (was_healthy, self.is_link_healthy()) {
            (true, false) => Some(LinkTransition::Lost),
            (false, true) => Some(LinkTransition::Restored),
            _ => None,
        }
    }

    /// Check if the link is healthy
    pub fn is_link_healthy(&self) -> bool {
        self.consecutive_failures < MAX_FAILED_SESSIONS
    }

    /// Get number of consecutive failed sessions
    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive_failures
    }

    /// Time of the last successful session, if any
    pub fn last_success_ms(&self) -> Option<u32> {
        self.last_success_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncError;

    const FAIL: SyncOutcome = SyncOutcome::Failed(SyncError::ConnectFailed);

    #[test]
    fn test_starts_healthy() {
        let monitor = LinkMonitor::new();
        assert!(monitor.is_link_healthy());
        assert_eq!(monitor.last_success_ms(), None);
    }

    #[test]
    fn test_link_lost() {
        let mut monitor = LinkMonitor::new();

        assert_eq!(monitor.record(&FAIL, 0), None);
        assert_eq!(monitor.record(&FAIL, 1), None);
        assert_eq!(monitor.record(&FAIL, 2), Some(LinkTransition::Lost));
        assert!(!monitor.is_link_healthy());

        // Further failures don't repeat the transition
        assert_eq!(monitor.record(&FAIL, 3), None);
        assert_eq!(monitor.consecutive_failures(), 4);
    }

    #[test]
    fn test_success_resets_counter() {
        let mut monitor = LinkMonitor::new();

        monitor.record(&FAIL, 0);
        monitor.record(&FAIL, 1);
        assert_eq!(monitor.consecutive_failures(), 2);

        assert_eq!(monitor.record(&SyncOutcome::NoResponse, 500), None);
        assert_eq!(monitor.consecutive_failures(), 0);
        assert_eq!(monitor.last_success_ms(), Some(500));
    }

    #[test]
    fn test_link_restored() {
        let mut monitor = LinkMonitor::new();
        for t in 0..3 {
            monitor.record(&FAIL, t);
        }

        assert_eq!(
            monitor.record(&SyncOutcome::Reported, 10),
            Some(LinkTransition::Restored)
        );
        assert!(monitor.is_link_healthy());
    }
}
