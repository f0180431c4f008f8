//! Authorization server sync
//!
//! Each exchange with the server is a short session over a fresh
//! connection: a scan report (send and close) or a heartbeat (send, wait
//! briefly for a response, optionally receive a new allow-list).

pub mod client;
pub mod state;

pub use client::{SyncClient, SyncError, SyncOutcome, SyncRequest};
pub use state::{SyncEvent, SyncState};
