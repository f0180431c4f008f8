//! Build script for latchkey-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates controller.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use latchkey_core::config::ControllerConfig;

/// GPIOs wired to fixed board functions (host UART, W5500 on SPI0)
const RESERVED_PINS: &[(u8, &str)] = &[
    (0, "host console TX"),
    (1, "host console RX"),
    (16, "W5500 MISO"),
    (17, "W5500 CS"),
    (18, "W5500 SCK"),
    (19, "W5500 MOSI"),
    (20, "W5500 RST"),
    (21, "W5500 INT"),
];

/// GPIO the reader is wired to on this board
const READER_RX_GPIO: u8 = 5;

/// Highest GPIO on the RP2040
const MAX_GPIO: u8 = 29;

/// Sections and keys the firmware understands
const KNOWN_KEYS: &[(&str, &[&str])] = &[
    ("reader", &["rx_pin", "baudrate"]),
    ("outputs", &["strike", "indicator"]),
    ("network", &["mac", "ip", "prefix_len", "gateway", "server"]),
    ("timing", &["unlock_duration_ms", "heartbeat_interval_ms", "ack_wait_ms", "reload_timeout_ms"]),
];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate controller.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=controller.toml");

    let config_path = Path::new("controller.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: controller.toml not found!                               ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a controller.toml configuration file.     ║\n\
            ║  Please create one in the latchkey-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read controller.toml                           ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Parse and validate TOML syntax
    let value: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => fail("Invalid TOML syntax in controller.toml", &[e.to_string()]),
    };

    let mut errors = check_known_keys(&value);
    errors.extend(check_single_line_arrays(&config_content));
    if !errors.is_empty() {
        fail("Unsupported controller.toml contents", &errors);
    }

    // Typed parse into the same struct the firmware uses
    let config: ControllerConfig = match toml::from_str(&config_content) {
        Ok(config) => config,
        Err(e) => fail("Invalid value in controller.toml", &[e.to_string()]),
    };

    if let Err(e) = config.validate() {
        fail("Invalid controller configuration", &[format!("{:?}", e)]);
    }

    let errors = check_board_pins(&config);
    if !errors.is_empty() {
        fail("Pin assignment not possible on this board", &errors);
    }

    println!("cargo:warning=controller.toml validated successfully");
}

/// Reject sections and keys the firmware would silently ignore
fn check_known_keys(value: &toml::Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(root) = value.as_table() else {
        return errors;
    };

    for (key, item) in root {
        if key == "version" {
            continue;
        }
        let Some((_, keys)) = KNOWN_KEYS.iter().find(|(name, _)| name == key) else {
            errors.push(format!("unknown section [{}]", key));
            continue;
        };
        let Some(table) = item.as_table() else {
            errors.push(format!("[{}] must be a table", key));
            continue;
        };
        for field in table.keys() {
            if !keys.contains(&field.as_str()) {
                errors.push(format!("[{}] unknown key '{}'", key, field));
            }
        }
    }

    if let Some(server) = value.get("network").and_then(|n| n.get("server")) {
        match server.as_table() {
            Some(table) => {
                for field in table.keys() {
                    if !["ip", "port"].contains(&field.as_str()) {
                        errors.push(format!("[network.server] unknown key '{}'", field));
                    }
                }
            }
            None => errors.push("[network.server] must be a table".to_string()),
        }
    }

    errors
}

/// The firmware's parser reads arrays on a single line only
fn check_single_line_arrays(content: &str) -> Vec<String> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.split('#').next().unwrap_or("").trim();
            let (_, value) = line.split_once('=')?;
            let value = value.trim();
            (value.starts_with('[') && !value.ends_with(']'))
                .then(|| format!("line {}: arrays must fit on one line", i + 1))
        })
        .collect()
}

/// Check configured pins against the board wiring
fn check_board_pins(config: &ControllerConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let outputs = [
        ("strike", config.outputs.strike.pin),
        ("indicator", config.outputs.indicator.pin),
    ];
    for (name, pin) in outputs {
        if pin > MAX_GPIO {
            errors.push(format!("{} pin gpio{} does not exist", name, pin));
        } else if pin == READER_RX_GPIO {
            errors.push(format!("{} pin gpio{} is the reader input", name, pin));
        } else if let Some((_, function)) = RESERVED_PINS.iter().find(|(p, _)| *p == pin) {
            errors.push(format!("{} pin gpio{} is reserved for {}", name, pin, function));
        }
    }

    if config.reader.rx_pin.pin != READER_RX_GPIO {
        errors.push(format!(
            "reader rx_pin must be gpio{} (UART1 RX on this board)",
            READER_RX_GPIO
        ));
    }

    errors
}

/// Abort the build with a boxed error listing
fn fail(title: &str, errors: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .flat_map(|e| e.lines())
            .map(format_error_line)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Format one error line with box drawing
fn format_error_line(line: &str) -> String {
    let truncated = if line.chars().count() > 62 {
        format!("{}...", line.chars().take(59).collect::<String>())
    } else {
        line.to_string()
    };
    format!("║  • {:<62} ║", truncated)
}
