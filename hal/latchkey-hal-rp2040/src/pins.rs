//! Config-driven pin assignment
//!
//! The firmware hands every GPIO not claimed by fixed board wiring to a
//! `PinBank`; the strike and indicator outputs are then taken from it by
//! the numbers found in the config.

use embassy_rp::gpio::AnyPin;
use embassy_rp::Peri;

use crate::gpio::GPIO_COUNT;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin(u8),
    /// Pin already taken
    AlreadyTaken(u8),
    /// Pin wired to a fixed board function
    Reserved(u8),
}

/// Pin bank holding the free GPIOs by number
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
    /// Bit per GPIO that was ever added
    known: u32,
}

impl Default for PinBank {
    fn default() -> Self {
        Self::new()
    }
}

impl PinBank {
    /// Create an empty bank; every pin reads as reserved until added
    pub fn new() -> Self {
        Self {
            pins: [const { None }; GPIO_COUNT],
            known: 0,
        }
    }

    /// Create a bank from `(number, pin)` pairs
    pub fn from_pins<const N: usize>(pins: [(u8, Peri<'static, AnyPin>); N]) -> Self {
        let mut bank = Self::new();
        for (num, pin) in pins {
            bank.insert(num, pin);
        }
        bank
    }

    /// Put a pin into the bank under its GPIO number
    pub fn insert(&mut self, pin_num: u8, pin: Peri<'static, AnyPin>) {
        if let Some(slot) = self.pins.get_mut(pin_num as usize) {
            *slot = Some(pin);
            self.known |= 1 << pin_num;
        }
    }

    /// Take a pin by number
    pub fn take(&mut self, pin_num: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        let slot = self
            .pins
            .get_mut(pin_num as usize)
            .ok_or(PinError::InvalidPin(pin_num))?;
        match slot.take() {
            Some(pin) => Ok(pin),
            None if self.known & (1 << pin_num) != 0 => Err(PinError::AlreadyTaken(pin_num)),
            None => Err(PinError::Reserved(pin_num)),
        }
    }

    /// Check if a pin is available
    pub fn is_available(&self, pin_num: u8) -> bool {
        self.pins
            .get(pin_num as usize)
            .is_some_and(|slot| slot.is_some())
    }
}
