//! UART configuration and pin mapping
//!
//! RP2040 has two UART peripherals (UART0 and UART1), each usable only
//! on specific GPIOs.

use embassy_rp::uart;
use latchkey_hal::uart::{DataBits, Parity, StopBits, UartConfig};

/// Convert a HAL line setting to the embassy-rp config
pub fn embassy_config(cfg: &UartConfig) -> uart::Config {
    let mut out = uart::Config::default();
    out.baudrate = cfg.baudrate;
    out.data_bits = match cfg.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    out.parity = match cfg.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    out.stop_bits = match cfg.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    out
}

/// UART peripheral identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartId {
    Uart0,
    Uart1,
}

/// Determine which UART can receive on a given GPIO
pub fn rx_pin_uart(gpio: u8) -> Option<UartId> {
    // UART0 RX: GPIO 1, 13, 17, 29
    // UART1 RX: GPIO 5, 9, 21, 25
    match gpio {
        1 | 13 | 17 | 29 => Some(UartId::Uart0),
        5 | 9 | 21 | 25 => Some(UartId::Uart1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_mapping() {
        assert_eq!(rx_pin_uart(5), Some(UartId::Uart1));
        assert_eq!(rx_pin_uart(1), Some(UartId::Uart0));
        assert_eq!(rx_pin_uart(4), None);
    }
}
