//! Server link health
//!
//! Tracks consecutive failed sync sessions. Purely observational: the door
//! keeps working from the last allow-list while the link is down.

pub mod monitor;

pub use monitor::{LinkMonitor, LinkTransition, MAX_FAILED_SESSIONS};
