//! Board wiring checks
//!
//! The host UART, the reader input and the W5500 are soldered to fixed
//! GPIOs. Only the strike and indicator come from the config, and they
//! must land on a pin the board leaves free.

use latchkey_core::config::ControllerConfig;
use latchkey_hal_rp2040::{GpioAllocator, GpioError};

/// GPIO wired to the reader's UART1 RX
pub const READER_RX_GPIO: u8 = 5;

/// GPIOs wired to fixed board functions: host UART and W5500 on SPI0
pub const BOARD_PINS: [u8; 8] = [0, 1, 16, 17, 18, 19, 20, 21];

/// Check the configured pins against each other and the board wiring
///
/// The reader input is reserved whatever `rx_pin` says, so an output can
/// never be assigned to it.
pub fn allocate_pins(config: &ControllerConfig) -> Result<(), GpioError> {
    let mut alloc = GpioAllocator::new();
    alloc.allocate_all(&BOARD_PINS)?;
    alloc.allocate(READER_RX_GPIO)?;
    if config.reader.rx_pin.pin != READER_RX_GPIO {
        alloc.allocate(config.reader.rx_pin.pin)?;
    }
    alloc.allocate_all(&[config.outputs.strike.pin, config.outputs.indicator.pin])
}
