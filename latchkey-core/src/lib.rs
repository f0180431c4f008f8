//! Board-agnostic core logic for the door controller firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Allow-list store with staged, all-or-nothing reloads
//! - Door strike / indicator actuator with a non-blocking unlock timer
//! - Server sync client (scan reports, heartbeats, reload transfers)
//! - Link health monitoring
//! - The controller that ties them together behind a single `poll()`
//! - Configuration type definitions
//!
//! Everything here is driven by explicit millisecond timestamps and
//! non-blocking I/O traits, so the same code runs on the target and under
//! host tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod actuator;
pub mod allowlist;
pub mod config;
pub mod controller;
pub mod events;
pub mod health;
pub mod sync;
pub mod traits;

#[cfg(test)]
mod mock;

pub use actuator::{Actuator, TriggerOutcome};
pub use allowlist::{AllowList, AllowListError, ReloadBuffer, ALLOW_LIST_CAPACITY, RELOAD_PAYLOAD_LEN};
pub use config::ControllerConfig;
pub use controller::{Controller, PollEvents};
pub use events::{ControllerEvent, HeartbeatEvent, HeartbeatKind, ScanEvent};
pub use health::{LinkMonitor, LinkTransition};
pub use sync::{SyncClient, SyncError, SyncOutcome, SyncRequest, SyncState};
pub use traits::NetLink;
