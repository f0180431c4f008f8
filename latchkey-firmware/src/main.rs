//! Latchkey - RFID Door Controller Firmware
//!
//! Main firmware binary for RP2040 boards with a 125KHz tag reader, a door
//! strike relay and a W5500 ethernet module. The allow-list lives in RAM
//! and is refreshed from the authorization server.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Ipv4Address, Ipv4Cidr, StackResources, StaticConfigV4};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{UART0, UART1};
use embassy_rp::spi::{Config as SpiConfig, Spi};
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUartRx, BufferedUartTx};
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use latchkey_core::config::{ControllerConfig, NetworkConfig, PinConfig};
use latchkey_core::Controller;
use latchkey_hal_rp2040::uart::{embassy_config, rx_pin_uart, UartId};
use latchkey_hal_rp2040::{PinBank, RpOutput};

use crate::config::{allocate_pins, parse_config, READER_RX_GPIO};
use crate::links::{ChannelLink, ChannelReader, HostConsole};
use crate::tasks::DoorController;

/// Embedded configuration (compiled into firmware)
/// Edit controller.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../controller.toml");

/// W5500 SPI clock
const ETH_SPI_HZ: u32 = 20_000_000;

mod channels;
mod config;
mod links;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

// Static cells for UART buffers (must live forever)
static HOST_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static READER_RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

// Network state
static ETH_STATE: StaticCell<embassy_net_wiznet::State<8, 8>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<2>> = StaticCell::new();

// The controller holds the allow-list and the reload buffer
static CONTROLLER: StaticCell<DoorController> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Latchkey firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // Host console: UART0 TX only
    let host_tx = BufferedUartTx::new(
        p.UART0,
        Irqs,
        p.PIN_0,
        HOST_TX_BUF.init([0u8; 256]),
        embassy_config(&latchkey_hal::UartConfig::default()),
    );

    // Tag reader: UART1 RX only
    let rx_pin = config.reader.rx_pin.pin;
    if rx_pin_uart(rx_pin) != Some(UartId::Uart1) {
        warn!("gpio{} is not a UART1 RX pin", rx_pin);
    }
    if rx_pin != READER_RX_GPIO {
        warn!(
            "Reader configured on gpio{}, but this board wires it to gpio{}",
            rx_pin, READER_RX_GPIO
        );
    }
    let reader_uart_config = embassy_config(&latchkey_hal::UartConfig {
        baudrate: config.reader.baudrate,
        ..latchkey_hal::UartConfig::reader()
    });
    let reader_rx = BufferedUartRx::new(
        p.UART1,
        Irqs,
        p.PIN_5,
        READER_RX_BUF.init([0u8; 64]),
        reader_uart_config,
    );
    info!("UARTs initialized, reader at {} baud", config.reader.baudrate);

    // Strike and indicator come from the config; the rest of the board is
    // fixed. GPIO 0-1, 5 and 16-21 are taken by the UARTs and the W5500.
    let mut bank = PinBank::from_pins([
        (2, p.PIN_2.into()),
        (3, p.PIN_3.into()),
        (4, p.PIN_4.into()),
        (6, p.PIN_6.into()),
        (7, p.PIN_7.into()),
        (8, p.PIN_8.into()),
        (9, p.PIN_9.into()),
        (10, p.PIN_10.into()),
        (11, p.PIN_11.into()),
        (12, p.PIN_12.into()),
        (13, p.PIN_13.into()),
        (14, p.PIN_14.into()),
        (15, p.PIN_15.into()),
        (22, p.PIN_22.into()),
        (23, p.PIN_23.into()),
        (24, p.PIN_24.into()),
        (25, p.PIN_25.into()),
        (26, p.PIN_26.into()),
        (27, p.PIN_27.into()),
        (28, p.PIN_28.into()),
        (29, p.PIN_29.into()),
    ]);
    let strike = take_output(&mut bank, config.outputs.strike);
    let indicator = take_output(&mut bank, config.outputs.indicator);
    info!(
        "Outputs: strike gpio{} (inverted={}), indicator gpio{} (inverted={})",
        config.outputs.strike.pin,
        config.outputs.strike.inverted,
        config.outputs.indicator.pin,
        config.outputs.indicator.inverted
    );

    // W5500 on SPI0: MISO 16, CS 17, SCK 18, MOSI 19, RST 20, INT 21
    let spi_config = {
        let mut cfg = SpiConfig::default();
        cfg.frequency = ETH_SPI_HZ;
        cfg
    };
    let spi = Spi::new(
        p.SPI0,
        p.PIN_18,
        p.PIN_19,
        p.PIN_16,
        p.DMA_CH0,
        p.DMA_CH1,
        spi_config,
    );
    let cs = Output::new(p.PIN_17, Level::High);
    let eth_int = Input::new(p.PIN_21, Pull::Up);
    let eth_reset = Output::new(p.PIN_20, Level::High);
    let spi_dev = match ExclusiveDevice::new(spi, cs, Delay) {
        Ok(dev) => dev,
        Err(never) => match never {},
    };

    let mac = config.network.mac;
    let eth = embassy_net_wiznet::new(
        mac,
        ETH_STATE.init(embassy_net_wiznet::State::new()),
        spi_dev,
        eth_int,
        eth_reset,
    )
    .await;

    match eth {
        Ok((device, eth_runner)) => {
            let (stack, net_runner) = embassy_net::new(
                device,
                net_config(&config.network),
                NET_RESOURCES.init(StackResources::new()),
                seed_from_mac(&mac),
            );
            info!("W5500 initialized");

            spawner.spawn(tasks::ethernet_task(eth_runner)).unwrap();
            spawner.spawn(tasks::net_stack_task(net_runner)).unwrap();
            spawner.spawn(tasks::net_session_task(stack)).unwrap();
        }
        Err(e) => {
            error!("W5500 init failed: {:?}", Debug2Format(&e));
            spawner.spawn(tasks::offline_session_task()).unwrap();
        }
    }

    let controller = CONTROLLER.init(Controller::new(
        config,
        ChannelReader,
        HostConsole::new(host_tx),
        ChannelLink::new(),
        indicator,
        strike,
    ));

    // Spawn tasks
    spawner.spawn(tasks::reader_rx_task(reader_rx)).unwrap();
    spawner.spawn(tasks::controller_task(controller)).unwrap();

    info!("All tasks spawned, firmware running");
}

/// Parse and validate the embedded configuration
///
/// Falls back to defaults if any step fails. All of them run at build
/// time, so this only happens during development.
fn load_config() -> ControllerConfig {
    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using default configuration");
            return ControllerConfig::default();
        }
    };

    if let Err(e) = config.validate() {
        error!("Embedded config invalid: {:?}", e);
        error!("Using default configuration");
        return ControllerConfig::default();
    }

    if let Err(e) = allocate_pins(&config) {
        error!("Embedded config pin conflict: {:?}", e);
        error!("Using default configuration");
        return ControllerConfig::default();
    }

    info!("Configuration loaded");
    config
}

/// Take a configured output from the bank, driven to its inactive level
///
/// `allocate_pins` reserves every pin the bank leaves out, so a loaded
/// config always finds its outputs here.
fn take_output(bank: &mut PinBank, pin: PinConfig) -> RpOutput<'static> {
    let gpio = unwrap!(bank.take(pin.pin));
    // Inactive level: low, or high for an inverted output
    RpOutput::new(Output::new(gpio, Level::from(pin.inverted)))
}

fn net_config(network: &NetworkConfig) -> embassy_net::Config {
    let [a, b, c, d] = network.ip;
    embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::new(a, b, c, d), network.prefix_len),
        gateway: network
            .gateway
            .map(|[a, b, c, d]| Ipv4Address::new(a, b, c, d)),
        dns_servers: Default::default(),
    })
}

/// TCP sequence number seed; unique per device is enough here
fn seed_from_mac(mac: &[u8; 6]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[..6].copy_from_slice(mac);
    u64::from_le_bytes(bytes) ^ 0x9E37_79B9_7F4A_7C15
}
