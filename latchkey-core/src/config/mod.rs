//! Configuration types
//!
//! Board-agnostic configuration structures. With the `serde` feature they
//! deserialize from the firmware's `controller.toml`.

pub mod hardware;
pub mod types;

pub use hardware::*;
pub use types::*;
