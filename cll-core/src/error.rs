//! Error type for link operations.

use crate::decoder::DecodeError;

/// Error returned by [`CastleLink`](crate::CastleLink) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// ESC count outside `1..=MAX_ESCS`.
    InvalidEscCount,
    /// The external throttle pin cannot raise edge interrupts on this board.
    UnmappablePin,
    /// Pulse bounds are inverted or do not fit the throttle period.
    InvalidPulseRange,
    /// Reconfiguration attempted while the tick clock is running.
    AlreadyArmed,
    /// Operation needs a successful `begin` first.
    NotStarted,
    /// ESC index outside the configured range.
    InvalidIndex,
    /// The watchdog did not release the snapshot in time.
    Timeout,
    /// The frame has no reference pulse yet.
    NotReady,
}

impl From<DecodeError> for LinkError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::NotReady => LinkError::NotReady,
        }
    }
}
