//! Hardware abstraction traits
//!
//! Pins and serial lines come from `latchkey-hal`. The network link lives
//! here because its shape is specific to the server sync session.

pub mod net;

pub use net::NetLink;
