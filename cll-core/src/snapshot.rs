//! Snapshot handshake between the foreground and the watchdog.
//!
//! The foreground sets the ESC's busy bit and waits. The watchdog clears it
//! at the next frame boundary that follows a complete frame, at which point
//! the frame is stable until the next ESC pulse.

use crate::types::RawFrame;

/// A pending snapshot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SnapshotRequest {
    index: usize,
    started_ms: u32,
    timeout_ms: u32,
}

impl SnapshotRequest {
    pub(crate) const fn new(index: usize, started_ms: u32, timeout_ms: u32) -> Self {
        Self {
            index,
            started_ms,
            timeout_ms,
        }
    }

    /// ESC the request is for.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// True once `now_ms` is at or past the deadline. Handles uptime wrap.
    #[inline]
    #[must_use]
    pub const fn is_expired(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.started_ms) >= self.timeout_ms
    }
}

/// Outcome of polling a [`SnapshotRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SnapshotPoll {
    /// The watchdog released the frame.
    Ready(RawFrame),
    /// Still waiting for a frame boundary.
    Pending,
    /// The deadline passed. The request stays registered, so a later
    /// attempt can still be satisfied.
    TimedOut,
}
