//! GPIO pin abstractions
//!
//! Provides the digital output trait used for the door strike and the
//! indicator LED. Chip-specific HALs implement it over their own pin types.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Output pin with a configurable active level
///
/// Door strikes are often driven through a relay or MOSFET board that
/// switches on a LOW level. `ActiveLevel` maps a logical on/off request
/// to the right electrical level.
pub struct ActiveLevel<P> {
    pin: P,
    /// If true, active = pin LOW
    inverted: bool,
}

impl<P: OutputPin> ActiveLevel<P> {
    /// Wrap a pin, driving it to the inactive level immediately
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut out = Self { pin, inverted };
        out.set_active(false);
        out
    }

    /// Drive the pin to its active (true) or inactive (false) level
    pub fn set_active(&mut self, active: bool) {
        // Normal: active=true, inverted=false → high
        // Inverted: active=true, inverted=true → low
        self.pin.set_state(active != self.inverted);
    }

    /// Check whether the pin currently sits at its active level
    pub fn is_active(&self) -> bool {
        self.pin.is_set_high() != self.inverted
    }

    /// Access the underlying pin
    pub fn pin(&self) -> &P {
        &self.pin
    }
}
