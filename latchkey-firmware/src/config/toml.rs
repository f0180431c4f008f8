//! Simple TOML parser for controller configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the controller configuration. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, integer array)
//! - [section] and [section.subsection] headers
//! - Decimal and 0x-prefixed hex integers, with `_` separators
//! - Comments (# ...)
//!
//! NOT supported:
//! - Multi-line strings or arrays
//! - Inline tables
//! - Dotted keys outside section headers

use latchkey_core::config::{ControllerConfig, PinConfig};
use latchkey_hal_rp2040::gpio::parse_pin_string;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ParseError {
    /// Unknown section header
    InvalidSection,
    /// Value of the wrong type or out of range
    InvalidValue,
    /// Array with the wrong number of elements
    WrongLength,
    /// Invalid pin string
    InvalidPin,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Reader,
    Outputs,
    Network,
    Server,
    Timing,
}

/// Parse TOML configuration into ControllerConfig
///
/// Keys that are absent keep their defaults. Unknown keys are ignored.
pub fn parse_config(input: &str) -> Result<ControllerConfig, ParseError> {
    let mut config = ControllerConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let header = strip_comment(header);
            let header = header.strip_suffix(']').ok_or(ParseError::InvalidSection)?;
            section = parse_section_header(header)?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "reader" => Ok(Section::Reader),
        "outputs" => Ok(Section::Outputs),
        "network" => Ok(Section::Network),
        "network.server" => Ok(Section::Server),
        "timing" => Ok(Section::Timing),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut ControllerConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Root => {
            if key == "version" {
                config.version = parse_int(value)?;
            }
        }
        Section::Reader => match key {
            "rx_pin" => config.reader.rx_pin = parse_pin(value)?,
            "baudrate" => config.reader.baudrate = parse_int(value)?,
            _ => {}
        },
        Section::Outputs => match key {
            "strike" => config.outputs.strike = parse_pin(value)?,
            "indicator" => config.outputs.indicator = parse_pin(value)?,
            _ => {}
        },
        Section::Network => match key {
            "mac" => config.network.mac = parse_array(value)?,
            "ip" => config.network.ip = parse_array(value)?,
            "prefix_len" => config.network.prefix_len = parse_int(value)?,
            "gateway" => config.network.gateway = Some(parse_array(value)?),
            _ => {}
        },
        Section::Server => match key {
            "ip" => config.network.server.ip = parse_array(value)?,
            "port" => config.network.server.port = parse_int(value)?,
            _ => {}
        },
        Section::Timing => match key {
            "unlock_duration_ms" => config.timing.unlock_duration_ms = parse_int(value)?,
            "heartbeat_interval_ms" => config.timing.heartbeat_interval_ms = parse_int(value)?,
            "ack_wait_ms" => config.timing.ack_wait_ms = parse_int(value)?,
            "reload_timeout_ms" => config.timing.reload_timeout_ms = parse_int(value)?,
            _ => {}
        },
    }
    Ok(())
}

/// Drop a trailing `# comment` that is not inside a string
fn strip_comment(value: &str) -> &str {
    match value.find('#') {
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value.trim(),
    }
}

/// Parse key = value line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = strip_comment(value);

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse an integer value, decimal or 0x hex
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ParseError> {
    let (digits, radix) = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (value, 10),
    };

    let mut result: u32 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        if c == '_' && seen_digit {
            continue;
        }
        let digit = c.to_digit(radix).ok_or(ParseError::InvalidValue)?;
        result = result
            .checked_mul(radix)
            .and_then(|r| r.checked_add(digit))
            .ok_or(ParseError::InvalidValue)?;
        seen_digit = true;
    }
    if !seen_digit {
        return Err(ParseError::InvalidValue);
    }

    T::try_from(result).map_err(|_| ParseError::InvalidValue)
}

/// Parse a single-line byte array like `[192, 168, 1, 177]`
fn parse_array<const N: usize>(value: &str) -> Result<[u8; N], ParseError> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or(ParseError::InvalidValue)?;

    let mut out = [0u8; N];
    let mut count = 0;
    for item in inner.split(',').map(str::trim) {
        // Trailing comma
        if item.is_empty() {
            continue;
        }
        let slot = out.get_mut(count).ok_or(ParseError::WrongLength)?;
        *slot = parse_int(item)?;
        count += 1;
    }

    if count != N {
        return Err(ParseError::WrongLength);
    }
    Ok(out)
}

/// Parse a pin string like "gpio15" or "!gpio15"
fn parse_pin(value: &str) -> Result<PinConfig, ParseError> {
    parse_pin_string(parse_string(value)).ok_or(ParseError::InvalidPin)
}
