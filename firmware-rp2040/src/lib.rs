//! Castle Link Live ESC interface for RP2040.
//!
//! This crate provides the board glue that runs the [`cll_core`] link engine
//! on a Raspberry Pi Pico and exposes it to a host over the [`cll_proto`]
//! serial monitor protocol.
//!
//! # Overview
//!
//! The firmware:
//! 1. Generates (or passes through) the throttle pulse on up to four ESC lines
//! 2. Times the telemetry pulses each ESC answers with
//! 3. Streams raw frames to the host over UART (38400 baud, 8N1)
//!
//! # Hardware Configuration
//!
//! | Function       | GPIO | Description |
//! |----------------|------|-------------|
//! | ESC 0..3       | 2-5  | Castle Link lines (open drain, pulled up) |
//! | Throttle input | 6    | External receiver signal |
//! | UART1 TX       | 8    | Telemetry and responses to host |
//! | UART1 RX       | 9    | Commands from host |
//!
//! # Architecture
//!
//! Timing work runs on a high-priority interrupt executor:
//!
//! - **Timer Task**: Serves compare and overflow deadlines ([`timer::run`])
//! - **Capture Tasks**: One per ESC line, timestamps telemetry pulses
//! - **Throttle Input Task**: Follows the external throttle signal
//!
//! Capture timestamps are taken when a capture task runs, so nothing else
//! shares that executor. The host link runs in thread mode:
//!
//! - **UART RX Task**: Parses host commands into a [`CommandQueue`](cll_proto::CommandQueue)
//! - **Monitor Task**: Answers commands and streams telemetry, yielding while
//!   a snapshot is pending
//!
//! # Modules
//!
//! - [`timer`]: 16-bit tick counter on top of the time driver ([`TimerState`])
//! - [`platform`]: hardware seams for the link ([`Rp2040Platform`], [`EmbassyUptime`])
//! - [`capture`]: edge listeners
//! - [`uart`]: host link ([`UartSink`], [`receive_commands`])
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

pub use cll_core::{CastleLink, TimingConfig};
pub use cll_proto::{CommandQueue, Monitor};

pub mod capture;
pub mod platform;
pub mod timer;
pub mod uart;

pub use platform::{EmbassyUptime, Rp2040Platform};
pub use timer::TimerState;
pub use uart::{receive_commands, UartSink, BAUD_RATE};

/// GPIO numbers of the ESC lines, in ESC order.
pub const ESC_PINS: [u8; 4] = [2, 3, 4, 5];

/// GPIO number of the external throttle input.
pub const THROTTLE_PIN: u8 = 6;

/// Link type used by the firmware.
pub type Link = CastleLink<'static, Rp2040Platform, EmbassyUptime>;
