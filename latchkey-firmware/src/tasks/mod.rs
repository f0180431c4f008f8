//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod controller;
pub mod net;
pub mod reader_rx;

pub use controller::{controller_task, DoorController};
pub use net::{ethernet_task, net_session_task, net_stack_task, offline_session_task, EthRunner, NetDevice};
pub use reader_rx::reader_rx_task;
