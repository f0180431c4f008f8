//! Hardware configuration types
//!
//! These types define the hardware-level configuration for pins, the
//! reader serial line and the network interface.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pin configuration with optional inversion
///
/// Written in config files as `"gpio15"`, or `"!gpio15"` for active-low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// GPIO pin number (0-29 for RP2040)
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
}

/// Pin string was not of the form `gpioN` / `!gpioN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidPin;

impl PinConfig {
    /// Create a new active-high pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
        }
    }

    /// Create an inverted (active-low) pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
        }
    }
}

impl FromStr for PinConfig {
    type Err = InvalidPin;

    fn from_str(s: &str) -> Result<Self, InvalidPin> {
        let s = s.trim();
        let (s, inverted) = match s.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let pin = s
            .strip_prefix("gpio")
            .and_then(|num| num.parse().ok())
            .ok_or(InvalidPin)?;
        Ok(Self { pin, inverted })
    }
}

impl fmt::Display for PinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            f.write_str("!")?;
        }
        write!(f, "gpio{}", self.pin)
    }
}

#[cfg(feature = "serde")]
impl Serialize for PinConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for PinConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(PinVisitor)
    }
}

#[cfg(feature = "serde")]
struct PinVisitor;

#[cfg(feature = "serde")]
impl serde::de::Visitor<'_> for PinVisitor {
    type Value = PinConfig;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a pin such as \"gpio15\" or \"!gpio15\"")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<PinConfig, E> {
        v.parse()
            .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
    }
}

/// Tag reader serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// UART RX pin wired to the reader's TX (never inverted)
    pub rx_pin: PinConfig,
    /// Baud rate (125KHz modules ship at 9600)
    pub baudrate: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            rx_pin: PinConfig::new(5),
            baudrate: 9600,
        }
    }
}

/// Door strike and indicator outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OutputConfig {
    /// Strike plate relay / MOSFET
    pub strike: PinConfig,
    /// Indicator LED
    pub indicator: PinConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            strike: PinConfig::new(15),
            indicator: PinConfig::new(25),
        }
    }
}

/// IPv4 address and TCP port of a remote peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Endpoint {
    /// IPv4 address octets
    pub ip: [u8; 4],
    /// TCP port
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint
    pub const fn new(ip: [u8; 4], port: u16) -> Self {
        Self { ip, port }
    }
}

/// Network interface and authorization server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkConfig {
    /// Ethernet MAC address of this device
    pub mac: [u8; 6],
    /// Static IPv4 address of this device
    pub ip: [u8; 4],
    /// Subnet prefix length
    pub prefix_len: u8,
    /// Default gateway, if any
    pub gateway: Option<[u8; 4]>,
    /// Authorization server
    pub server: Endpoint,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac: [0xDE, 0xAD, 0xBE, 0xEF, 0xFE, 0xED],
            ip: [192, 168, 1, 177],
            prefix_len: 24,
            gateway: Some([192, 168, 1, 1]),
            server: Endpoint::new([192, 168, 1, 100], 9999),
        }
    }
}
