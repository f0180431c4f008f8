//! Configuration loading and parsing
//!
//! The controller config is compiled into the firmware as TOML and
//! parsed at startup by a small no_std parser. `build.rs` has already
//! validated the same file with the full `toml` crate.

pub mod board;
pub mod toml;

pub use board::{allocate_pins, READER_RX_GPIO};
pub use toml::{parse_config, ParseError};
