//! Castle Link Live serial monitor protocol.
//!
//! A host application talks to the ESC interface over a serial line
//! (38400 baud, 8N1). It configures and arms the link with short command
//! frames and receives one telemetry frame per ESC per cycle.
//!
//! # Modules
//!
//! - [`command`]: host-to-device frames ([`Command`], [`CommandId`])
//! - [`parser`]: byte-at-a-time command parser ([`CommandParser`])
//! - [`queue`]: bounded FIFO between the UART and the dispatcher ([`CommandQueue`])
//! - [`report`]: device-to-host telemetry and response frames
//! - [`sink`]: async output trait ([`ReportSink`])
//! - [`monitor`]: session state machine driving a [`cll_core::CastleLink`] ([`Monitor`])
//!
//! # Wire format
//!
//! | Direction     | Frame                                         | Length |
//! |---------------|-----------------------------------------------|--------|
//! | host → device | `00 id lsb msb xor`                           | 5      |
//! | device → host | `FF F0\|P\|esc ticks[11] (BE) xor pad`         | 26     |
//! | device → host | `55 AA\|ack`                                  | 2      |
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod checksum;
pub mod command;
pub mod monitor;
pub mod parser;
pub mod queue;
pub mod report;
pub mod sink;

pub use checksum::xor_checksum;
pub use command::{Command, CommandError, CommandId, COMMAND_FRAME_LEN, COMMAND_HEADER};
pub use monitor::{Monitor, MonitorConfig, MonitorState};
pub use parser::CommandParser;
pub use queue::{CommandQueue, QUEUE_LEN};
pub use report::{encode_response, encode_telemetry, RESPONSE_FRAME_LEN, TELEMETRY_FRAME_LEN};
pub use sink::{ReportSink, SinkError};
