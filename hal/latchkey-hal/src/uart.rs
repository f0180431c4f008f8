//! UART serial communication abstractions
//!
//! Provides traits for serial communication that can be implemented by
//! chip-specific HALs. The receive side is non-blocking so that the
//! controller loop never stalls waiting on the tag reader.

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Copy already-received bytes into `buf`
    ///
    /// Never blocks. Returns `Ok(0)` when no bytes are pending.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Read a single pending byte, if any
    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut buf = [0u8; 1];
        match self.read_available(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl UartConfig {
    /// 9600 8N1, the line setting of 125KHz reader modules
    pub const fn reader() -> Self {
        Self {
            baudrate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct QueueRx {
        bytes: [u8; 4],
        pos: usize,
    }

    impl UartRx for QueueRx {
        type Error = ();

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            let remaining = &self.bytes[self.pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_try_read_byte_drains_then_none() {
        let mut rx = QueueRx {
            bytes: [0x02, b'A', b'B', 0x03],
            pos: 0,
        };

        assert_eq!(rx.try_read_byte(), Ok(Some(0x02)));
        assert_eq!(rx.try_read_byte(), Ok(Some(b'A')));
        assert_eq!(rx.try_read_byte(), Ok(Some(b'B')));
        assert_eq!(rx.try_read_byte(), Ok(Some(0x03)));
        assert_eq!(rx.try_read_byte(), Ok(None));
    }

    #[test]
    fn test_reader_config_is_9600_8n1() {
        let cfg = UartConfig::reader();
        assert_eq!(cfg.baudrate, 9600);
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.stop_bits, StopBits::One);
    }
}
