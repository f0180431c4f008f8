//! GPIO allocation and management
//!
//! Tracks which GPIO pins are in use to prevent conflicts, and adapts
//! embassy-rp outputs to the `latchkey-hal` pin trait.

use embassy_rp::gpio::Output;
use heapless::FnvIndexSet;
use latchkey_core::config::PinConfig;

/// Maximum number of GPIO pins on RP2040
pub const GPIO_COUNT: usize = 30;

/// GPIO allocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioError {
    /// Pin number out of range (0-29 valid)
    InvalidPin(u8),
    /// Pin already assigned to another function
    AlreadyAllocated(u8),
}

/// GPIO allocator to track pin usage
pub struct GpioAllocator {
    /// Set of allocated GPIO pins
    allocated: FnvIndexSet<u8, 32>,
}

impl Default for GpioAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioAllocator {
    /// Create a new GPIO allocator
    pub fn new() -> Self {
        Self {
            allocated: FnvIndexSet::new(),
        }
    }

    /// Allocate a GPIO pin
    pub fn allocate(&mut self, pin: u8) -> Result<(), GpioError> {
        if pin >= GPIO_COUNT as u8 {
            return Err(GpioError::InvalidPin(pin));
        }
        if self.allocated.contains(&pin) {
            return Err(GpioError::AlreadyAllocated(pin));
        }
        // Capacity exceeds GPIO_COUNT
        self.allocated
            .insert(pin)
            .map_err(|_| GpioError::InvalidPin(pin))?;
        Ok(())
    }

    /// Allocate several pins, stopping at the first conflict
    pub fn allocate_all(&mut self, pins: &[u8]) -> Result<(), GpioError> {
        pins.iter().try_for_each(|&pin| self.allocate(pin))
    }
}

/// Parse a pin string from config
///
/// Supports formats:
/// - "gpio11" -> (11, false)
/// - "!gpio12" -> (12, true) (inverted/active-low)
///
/// Pins beyond the RP2040's 30 GPIOs are rejected.
pub fn parse_pin_string(s: &str) -> Option<PinConfig> {
    let pin: PinConfig = s.parse().ok()?;
    if pin.pin >= GPIO_COUNT as u8 {
        return None;
    }
    Some(pin)
}

/// Push-pull output driving a strike relay or LED
pub struct RpOutput<'d>(Output<'d>);

impl<'d> RpOutput<'d> {
    pub fn new(output: Output<'d>) -> Self {
        Self(output)
    }
}

impl latchkey_hal::OutputPin for RpOutput<'_> {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}
