//! Network tasks
//!
//! - `ethernet_task` drives the W5500 over SPI
//! - `net_stack_task` runs the embassy-net stack
//! - `net_session_task` carries out the controller's `NetCommand`s on a
//!   TCP socket, one connection per sync session
//! - `offline_session_task` stands in when the W5500 failed to start

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, IpEndpoint, Ipv4Address, Stack};
use embassy_net_wiznet::chip::W5500;
use embassy_net_wiznet::Device;
use embassy_rp::gpio::{Input, Output};
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Async, Spi};
use embassy_time::{Delay, Duration};
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_io_async::Write;
use heapless::Vec;

use latchkey_core::config::Endpoint;

use crate::channels::{NetCommand, NetEvent, SessionId, NET_CHUNK_LEN, NET_CMD, NET_EVENT};

/// SPI device wired to the W5500
pub type EthSpi = ExclusiveDevice<Spi<'static, SPI0, Async>, Output<'static>, Delay>;

/// W5500 driver runner
pub type EthRunner = embassy_net_wiznet::Runner<'static, W5500, EthSpi, Input<'static>, Output<'static>>;

/// Network device handed to embassy-net
pub type NetDevice = Device<'static>;

/// TCP buffer sizes; the largest exchange is one allow-list payload
const TCP_RX_BUF: usize = 1024;
const TCP_TX_BUF: usize = 256;

/// Give up on an unresponsive peer
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Ethernet task - services the W5500 chip
#[embassy_executor::task]
pub async fn ethernet_task(runner: EthRunner) -> ! {
    runner.run().await
}

/// Stack task - runs embassy-net
#[embassy_executor::task]
pub async fn net_stack_task(mut runner: embassy_net::Runner<'static, NetDevice>) -> ! {
    runner.run().await
}

/// Session task - one TCP connection per controller session
#[embassy_executor::task]
pub async fn net_session_task(stack: Stack<'static>) {
    info!("Net session task started");

    stack.wait_link_up().await;
    info!("Ethernet link up");

    let mut rx_buf = [0u8; TCP_RX_BUF];
    let mut tx_buf = [0u8; TCP_TX_BUF];
    let mut next: Option<NetCommand> = None;

    loop {
        let cmd = match next.take() {
            Some(cmd) => cmd,
            None => NET_CMD.receive().await,
        };

        let (session, endpoint) = match cmd {
            NetCommand::Open { session, endpoint } => (session, endpoint),
            other => {
                trace!("Ignoring {:?} outside a session", other);
                continue;
            }
        };

        let mut socket = TcpSocket::new(stack, &mut rx_buf, &mut tx_buf);
        socket.set_timeout(Some(SOCKET_TIMEOUT));

        debug!("Session {}: connecting to {:?}", session, endpoint);
        if let Err(e) = socket.connect(remote(&endpoint)).await {
            warn!("Session {}: connect failed: {:?}", session, e);
            NET_EVENT.send(NetEvent::Failed { session }).await;
            continue;
        }
        NET_EVENT.send(NetEvent::Connected { session }).await;

        next = run_session(&mut socket, session).await;

        socket.close();
        if let Err(e) = socket.flush().await {
            debug!("Session {}: flush on close failed: {:?}", session, e);
        }
        socket.abort();
    }
}

/// Offline session task - fails every session so the link reads as lost
///
/// Scanning and unlocking keep working from the current allow-list.
#[embassy_executor::task]
pub async fn offline_session_task() {
    warn!("Ethernet unavailable, running offline");

    loop {
        if let NetCommand::Open { session, .. } = NET_CMD.receive().await {
            NET_EVENT.send(NetEvent::Failed { session }).await;
        }
    }
}

/// Serve one open connection until it closes or a new session starts
///
/// Returns an `Open` that arrived before this session was closed.
async fn run_session(socket: &mut TcpSocket<'_>, session: SessionId) -> Option<NetCommand> {
    let mut buf = [0u8; NET_CHUNK_LEN];

    loop {
        match select(NET_CMD.receive(), socket.read(&mut buf)).await {
            Either::First(NetCommand::Send { session: s, data }) if s == session => {
                if let Err(e) = socket.write_all(&data).await {
                    warn!("Session {}: write failed: {:?}", session, e);
                    NET_EVENT.send(NetEvent::Failed { session }).await;
                    return None;
                }
            }
            Either::First(NetCommand::Close { session: s }) if s == session => {
                debug!("Session {}: closed by controller", session);
                return None;
            }
            Either::First(cmd @ NetCommand::Open { .. }) => return Some(cmd),
            Either::First(stale) => trace!("Dropping stale {:?}", stale),
            Either::Second(Ok(0)) => {
                debug!("Session {}: closed by server", session);
                NET_EVENT.send(NetEvent::Closed { session }).await;
                return None;
            }
            Either::Second(Ok(n)) => {
                // buf is exactly one chunk long
                let data = Vec::from_slice(&buf[..n]).unwrap_or_default();
                NET_EVENT.send(NetEvent::Data { session, data }).await;
            }
            Either::Second(Err(e)) => {
                warn!("Session {}: read failed: {:?}", session, e);
                NET_EVENT.send(NetEvent::Failed { session }).await;
                return None;
            }
        }
    }
}

fn remote(endpoint: &Endpoint) -> IpEndpoint {
    let [a, b, c, d] = endpoint.ip;
    IpEndpoint::new(IpAddress::Ipv4(Ipv4Address::new(a, b, c, d)), endpoint.port)
}
