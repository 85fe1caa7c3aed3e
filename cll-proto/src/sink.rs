//! Output side of the monitor link.

use core::future::Future;

/// Error type for report output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// UART/communication I/O error.
    Io,
}

/// Async byte sink for responses and telemetry frames.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait ReportSink {
    /// Write a complete frame.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), SinkError>>;
}
