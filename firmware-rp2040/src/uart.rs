//! Serial link to the host monitor.
//!
//! Commands are parsed as bytes arrive and queued for the monitor task;
//! responses and telemetry go out through [`UartSink`].

use cll_proto::{CommandParser, CommandQueue, ReportSink, SinkError};
use embassy_rp::uart::{Async, UartRx, UartTx};

/// Host link baud rate.
pub const BAUD_RATE: u32 = 38_400;

/// UART transmitter as a report sink.
pub struct UartSink<'d> {
    tx: UartTx<'d, Async>,
}

impl<'d> UartSink<'d> {
    #[must_use]
    pub fn new(tx: UartTx<'d, Async>) -> Self {
        Self { tx }
    }
}

impl ReportSink for UartSink<'_> {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.tx.write(bytes).await.map_err(|_| SinkError::Io)
    }
}

/// Receive command frames forever, queueing each one.
///
/// Bad frames and commands arriving at a full queue are dropped.
pub async fn receive_commands(mut rx: UartRx<'_, Async>, queue: &CommandQueue) -> ! {
    let mut parser = CommandParser::new();
    let mut byte_buf = [0u8; 1];

    loop {
        if let Err(e) = rx.read(&mut byte_buf).await {
            defmt::warn!("UART read error: {}", e);
            parser.reset();
            continue;
        }

        match parser.push_byte(byte_buf[0]) {
            Ok(Some(command)) => {
                if let Err(dropped) = queue.push(command) {
                    defmt::warn!("Command queue full, dropped {}", dropped);
                }
            }
            Ok(None) => {}
            Err(e) => {
                defmt::warn!("Bad command frame: {}", e);
                parser.reset();
            }
        }
    }
}
