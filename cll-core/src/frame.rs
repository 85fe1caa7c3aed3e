//! Per-ESC frame capture.
//!
//! Each ESC pulse stores the current tick count into the next slot. The
//! cursor starts out "before slot 0" after a frame boundary, so the first
//! pulse after a gap always lands in [`FrameSlot::Reference`].
//!
//! [`FrameSlot::Reference`]: crate::types::FrameSlot::Reference

use crate::types::{RawFrame, FRAME_LEN};

/// Capture state of one ESC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    frame: RawFrame,
    /// Slot written by the last capture. `None` right after a frame boundary.
    cursor: Option<usize>,
    /// A pulse arrived since the last watchdog run.
    ticked: bool,
    /// The last capture completed the frame.
    ready: bool,
}

impl ChannelState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame: RawFrame::EMPTY,
            cursor: None,
            ticked: false,
            ready: false,
        }
    }

    /// Record one ESC pulse. A zero tick count means the clock was stopped
    /// and is ignored. Pulses past the last slot are dropped and the frame
    /// is no longer treated as complete.
    ///
    /// Returns `false` if the pulse overran the frame.
    pub fn record(&mut self, ticks: u16) -> bool {
        if ticks == 0 {
            return true;
        }

        let next = match self.cursor {
            None => 0,
            Some(i) => i + 1,
        };

        self.ticked = true;
        if next >= FRAME_LEN {
            self.ready = false;
            return false;
        }

        self.frame.ticks[next] = ticks;
        self.cursor = Some(next);
        self.ready = next == FRAME_LEN - 1;
        true
    }

    /// Watchdog step. A channel that saw no pulse during the last reset
    /// window returns to the frame boundary.
    ///
    /// Returns `true` when the channel sits on a boundary with a complete
    /// frame, which releases any pending snapshot.
    pub fn settle(&mut self) -> bool {
        if self.ticked {
            self.ticked = false;
        } else {
            self.cursor = None;
        }

        if self.cursor.is_none() && self.ready {
            self.ready = false;
            true
        } else {
            false
        }
    }

    /// Last captured frame. Slots of a frame in progress may be a mix of
    /// the previous and the current frame.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> &RawFrame {
        &self.frame
    }

    #[inline]
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Slot that received the last pulse.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Forget everything captured so far.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}
