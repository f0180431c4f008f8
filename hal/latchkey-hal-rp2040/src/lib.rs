//! RP2040-specific HAL for the door controller firmware
//!
//! This crate provides RP2040-specific implementations of the shared
//! `latchkey-hal` traits, plus RP2040-specific functionality:
//!
//! - GPIO allocation and pin string parsing
//! - Config-driven output pin assignment
//! - UART pin mapping

#![no_std]

pub mod gpio;
pub mod pins;
pub mod uart;

pub use gpio::{GpioAllocator, GpioError, RpOutput};
pub use pins::{PinBank, PinError};
