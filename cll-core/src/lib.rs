//! Platform-agnostic Castle Link Live engine.
//!
//! Castle Creations ESCs in Link Live mode report telemetry by pulling the
//! throttle line low after every throttle pulse. The delay between the end
//! of the throttle pulse and the ESC's pulse encodes one value of an
//! eleven-value frame. This crate owns everything between the raw
//! interrupts and the decoded numbers, without touching any hardware:
//!
//! - [`types`]: raw frames, frame slots, line levels ([`RawFrame`], [`FrameSlot`])
//! - [`config`]: timing constants and derived tick budgets ([`TimingConfig`])
//! - [`hal`]: traits the board implements ([`TickClock`], [`LineDriver`], [`EventControl`])
//! - [`frame`]: per-ESC capture state machine ([`ChannelState`])
//! - [`watchdog`]: frame-boundary reset and snapshot release
//! - [`throttle`]: pulse generation and external signal measurement ([`ThrottleEngine`])
//! - [`decoder`]: conversion of a raw frame into physical units ([`Telemetry`])
//! - [`link`]: the facade shared between interrupt handlers and the application ([`CastleLink`])
//!
//! # Timing model
//!
//! ```text
//!  throttle pulse   ESC pulse
//!   ____________     __
//! _|            |___|  |____________ ... 20 ms period
//!               ^---^
//!               ticks captured into the next frame slot
//! ```
//!
//! A gap longer than the frame reset time (6 ms by default) marks a frame
//! boundary. A frame is complete once all eleven slots were captured.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and logging (for embedded targets)
//! - **`mock`**: Export [`mock::MockPlatform`] and [`mock::MockUptime`] for downstream tests

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// Must stay first so the logging macros are visible to every module below.
mod fmt;

pub mod config;
pub mod decoder;
pub mod error;
pub mod flags;
pub mod frame;
pub mod hal;
pub mod link;
pub mod presence;
pub mod snapshot;
pub mod throttle;
pub mod types;
pub mod watchdog;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::TimingConfig;
pub use decoder::{decode, DecodeError, Telemetry, TemperatureSensor};
pub use error::LinkError;
pub use flags::TimingFlags;
pub use frame::ChannelState;
pub use hal::{Compare, EventControl, EventSource, LineDriver, Platform, TickClock, Uptime};
pub use link::CastleLink;
pub use presence::PresenceHandler;
pub use snapshot::{SnapshotPoll, SnapshotRequest};
pub use throttle::ThrottleEngine;
pub use types::{FrameSlot, Level, RawFrame, ThrottleMode, ThrottleSource, FRAME_LEN, MAX_ESCS};
