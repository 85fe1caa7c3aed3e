//! Deterministic platform for host tests.
//!
//! [`MockPlatform`] records what the engine asked of the hardware instead of
//! doing it. Tests set the tick counter by hand and fire interrupt entry
//! points directly. [`MockUptime`] advances by a fixed step on every read,
//! so timeouts elapse after a known number of polls.

use portable_atomic::{AtomicU32, Ordering};

use crate::hal::{Compare, EventControl, EventSource, LineDriver, TickClock, Uptime};
use crate::types::Level;

/// Recording platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPlatform {
    ticks: u16,
    running: bool,
    level: Level,
    listening: bool,
    capturing: bool,
    esc_count: usize,
    compares: [u16; 2],
    enabled: [bool; 4],
    /// Pins that can raise edge interrupts, one bit per pin.
    edge_pins: u32,
    throttle_pin: Option<u8>,
}

impl MockPlatform {
    /// Platform whose pins 8..=15 can raise edge interrupts.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_edge_pins(0x0000_FF00)
    }

    #[must_use]
    pub const fn with_edge_pins(edge_pins: u32) -> Self {
        Self {
            ticks: 0,
            running: false,
            level: Level::High,
            listening: false,
            capturing: false,
            esc_count: 0,
            compares: [0; 2],
            enabled: [false; 4],
            edge_pins,
            throttle_pin: None,
        }
    }

    /// Set the counter value the next capture will read.
    pub fn set_ticks(&mut self, ticks: u16) {
        self.ticks = ticks;
    }

    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.listening
    }

    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.capturing
    }

    #[must_use]
    pub const fn esc_count(&self) -> usize {
        self.esc_count
    }

    #[must_use]
    pub const fn compare(&self, compare: Compare) -> u16 {
        self.compares[compare as usize]
    }

    #[must_use]
    pub const fn throttle_pin(&self) -> Option<u8> {
        self.throttle_pin
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for MockPlatform {
    fn ticks(&self) -> u16 {
        self.ticks
    }

    fn clear(&mut self) {
        self.ticks = 0;
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl LineDriver for MockPlatform {
    fn configure(&mut self, esc_count: usize) {
        self.esc_count = esc_count;
        self.capturing = false;
        self.drive(Level::High);
    }

    fn drive(&mut self, level: Level) {
        self.listening = false;
        self.level = level;
    }

    fn listen(&mut self) {
        self.listening = true;
        self.capturing = true;
    }

    fn mute(&mut self) {
        self.capturing = false;
    }

    fn level(&self) -> Level {
        self.level
    }
}

impl EventControl for MockPlatform {
    fn set_compare(&mut self, compare: Compare, ticks: u16) {
        self.compares[compare as usize] = ticks;
    }

    fn enable(&mut self, source: EventSource) {
        self.enabled[source as usize] = true;
    }

    fn disable(&mut self, source: EventSource) {
        self.enabled[source as usize] = false;
    }

    fn is_enabled(&self, source: EventSource) -> bool {
        self.enabled[source as usize]
    }

    fn bind_throttle_input(&mut self, pin: u8) -> bool {
        if pin < 32 && self.edge_pins & (1 << pin) != 0 {
            self.throttle_pin = Some(pin);
            true
        } else {
            false
        }
    }
}

/// Uptime that advances by `step_ms` on every read.
#[derive(Debug)]
pub struct MockUptime {
    now_ms: AtomicU32,
    step_ms: u32,
}

impl MockUptime {
    #[must_use]
    pub const fn new(step_ms: u32) -> Self {
        Self {
            now_ms: AtomicU32::new(0),
            step_ms,
        }
    }

    /// Uptime that never advances on its own.
    #[must_use]
    pub const fn frozen() -> Self {
        Self::new(0)
    }

    pub fn advance(&self, ms: u32) {
        self.now_ms.fetch_add(ms, Ordering::AcqRel);
    }
}

impl Uptime for MockUptime {
    fn now_ms(&self) -> u32 {
        self.now_ms.fetch_add(self.step_ms, Ordering::AcqRel)
    }
}
