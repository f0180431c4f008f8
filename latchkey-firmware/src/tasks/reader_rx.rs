//! Tag reader UART receive task
//!
//! Forwards raw bytes from the reader module to the controller. Framing
//! and checksum checks happen in the controller's parser.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use crate::channels::READER_BYTES;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 32;

/// Reader RX task - moves bytes from the UART into the reader channel
#[embassy_executor::task]
pub async fn reader_rx_task(mut rx: BufferedUartRx) {
    info!("Reader RX task started");

    let mut buf = [0u8; RX_BUF_SIZE];
    let mut dropped: u32 = 0;

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("Reader RX: {} bytes", n);
                for &byte in &buf[..n] {
                    if READER_BYTES.try_send(byte).is_err() {
                        dropped = dropped.wrapping_add(1);
                    }
                }
                if dropped > 0 {
                    // The parser resynchronizes on the next header byte
                    warn!("Reader channel full, {} bytes dropped", dropped);
                    dropped = 0;
                }
            }
            Ok(_) => {}
            Err(e) => {
                // Framing errors are common while a tag enters the field
                debug!("Reader UART error: {:?}", e);
            }
        }
    }
}
