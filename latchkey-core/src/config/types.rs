//! Configuration type definitions
//!
//! These types represent the controller configuration. The firmware embeds
//! a TOML file, validated at build time, and parses it into these types at
//! boot.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::hardware::{NetworkConfig, OutputConfig, ReaderConfig};

/// Current configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// How long the strike stays released after a match (ms)
    pub unlock_duration_ms: u32,
    /// Interval between timestamp heartbeats (ms)
    pub heartbeat_interval_ms: u32,
    /// How long to wait for the server's response byte (ms)
    pub ack_wait_ms: u32,
    /// Upper bound on a complete reload transfer (ms)
    pub reload_timeout_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            unlock_duration_ms: 2_000,
            heartbeat_interval_ms: 300_000,
            ack_wait_ms: 500,
            reload_timeout_ms: 5_000,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Configuration version for compatibility checks
    pub version: u8,
    /// Reader serial line
    pub reader: ReaderConfig,
    /// Strike and indicator outputs
    pub outputs: OutputConfig,
    /// Network interface and server
    pub network: NetworkConfig,
    /// Timing parameters
    pub timing: TimingConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            reader: ReaderConfig::default(),
            outputs: OutputConfig::default(),
            network: NetworkConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Config version mismatch
    VersionMismatch,
    /// A timing value was zero
    ZeroDuration,
    /// The same GPIO is assigned to more than one function
    PinConflict(u8),
    /// Server port is zero
    InvalidServerPort,
    /// Subnet prefix longer than 32 bits
    InvalidPrefix,
    /// The reader RX pin cannot be inverted
    InvertedInput,
}

impl ControllerConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the configuration for values the controller cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }

        let t = &self.timing;
        if t.unlock_duration_ms == 0
            || t.heartbeat_interval_ms == 0
            || t.ack_wait_ms == 0
            || t.reload_timeout_ms == 0
        {
            return Err(ConfigError::ZeroDuration);
        }

        if self.reader.rx_pin.inverted {
            return Err(ConfigError::InvertedInput);
        }

        let pins = [
            self.reader.rx_pin.pin,
            self.outputs.strike.pin,
            self.outputs.indicator.pin,
        ];
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(ConfigError::PinConflict(*pin));
            }
        }

        if self.network.server.port == 0 {
            return Err(ConfigError::InvalidServerPort);
        }
        if self.network.prefix_len > 32 {
            return Err(ConfigError::InvalidPrefix);
        }

        Ok(())
    }
}
