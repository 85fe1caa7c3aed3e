//! Flags shared between the interrupt handlers and the foreground.
//!
//! One byte: bit `i` marks a pending snapshot request for ESC `i`, the top
//! bit records whether a throttle signal is currently present. Every update
//! is a single atomic read-modify-write, so a foreground request never races
//! with the watchdog clearing another ESC's bit.

use portable_atomic::{AtomicU8, Ordering};

use crate::types::MAX_ESCS;

const PRESENT: u8 = 0x80;

/// Busy and presence bits.
#[derive(Debug)]
pub struct TimingFlags(AtomicU8);

const _: () = assert!(MAX_ESCS <= 7, "busy bits must not collide with the presence bit");

impl TimingFlags {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    #[inline]
    fn busy_bit(index: usize) -> u8 {
        1 << index
    }

    /// Ask the watchdog to release a snapshot for ESC `index`.
    pub fn set_busy(&self, index: usize) {
        self.0.fetch_or(Self::busy_bit(index), Ordering::AcqRel);
    }

    /// Release a pending snapshot for ESC `index`.
    pub fn clear_busy(&self, index: usize) {
        self.0.fetch_and(!Self::busy_bit(index), Ordering::AcqRel);
    }

    #[must_use]
    pub fn is_busy(&self, index: usize) -> bool {
        self.0.load(Ordering::Acquire) & Self::busy_bit(index) != 0
    }

    pub fn set_present(&self) {
        self.0.fetch_or(PRESENT, Ordering::AcqRel);
    }

    pub fn clear_present(&self) {
        self.0.fetch_and(!PRESENT, Ordering::AcqRel);
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.0.load(Ordering::Acquire) & PRESENT != 0
    }

    /// Drop every flag.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }
}

impl Default for TimingFlags {
    fn default() -> Self {
        Self::new()
    }
}
