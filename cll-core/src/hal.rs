//! Hardware seams.
//!
//! The engine never touches registers. A board provides one value that
//! implements [`TickClock`], [`LineDriver`] and [`EventControl`] (and so
//! [`Platform`]), plus a separate [`Uptime`] used by the foreground while it
//! waits for snapshots. The platform lives inside the link's critical
//! section; the uptime source does not, so it must be readable from `&self`.

use crate::types::Level;

/// Free-running 16-bit tick counter.
pub trait TickClock {
    /// Current counter value. Wraps at the configured resolution.
    fn ticks(&self) -> u16;

    /// Reset the counter to zero.
    fn clear(&mut self);

    /// Start counting from the current value.
    fn start(&mut self);

    /// Freeze the counter.
    fn stop(&mut self);

    /// True while the counter advances.
    fn is_running(&self) -> bool;
}

/// The ESC signal lines, all switched together.
pub trait LineDriver {
    /// Prepare the first `esc_count` lines as outputs driven high.
    fn configure(&mut self, esc_count: usize);

    /// Drive all lines as outputs at `level`.
    fn drive(&mut self, level: Level);

    /// Release all lines to inputs and enable ESC pulse capture,
    /// discarding any capture that was pending.
    fn listen(&mut self);

    /// Disable ESC pulse capture without changing line direction.
    fn mute(&mut self);

    /// Level last driven onto the lines.
    fn level(&self) -> Level;
}

/// Compare channels of the tick clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Compare {
    /// Fires when no ESC pulse arrived for the frame reset time.
    Watchdog,
    /// Fires at the next throttle pulse edge in generating mode.
    PulseGen,
}

/// Interrupt sources the engine switches on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventSource {
    Watchdog,
    PulseGen,
    /// Tick counter wrapped.
    Overflow,
    /// Either edge on the external throttle input.
    ThrottleEdge,
}

/// Interrupt routing for the tick clock and the throttle input.
pub trait EventControl {
    /// Program a compare channel, in ticks after the last clear.
    fn set_compare(&mut self, compare: Compare, ticks: u16);

    fn enable(&mut self, source: EventSource);

    fn disable(&mut self, source: EventSource);

    fn is_enabled(&self, source: EventSource) -> bool;

    /// Route the given pin to the throttle edge interrupt.
    ///
    /// Returns `false` if the board cannot raise edge interrupts on it.
    fn bind_throttle_input(&mut self, pin: u8) -> bool;
}

/// Everything the engine needs from a board.
pub trait Platform: TickClock + LineDriver + EventControl {}

impl<T: TickClock + LineDriver + EventControl> Platform for T {}

/// Millisecond uptime for snapshot timeouts.
pub trait Uptime {
    /// Milliseconds since an arbitrary epoch. May wrap.
    fn now_ms(&self) -> u32;
}

impl<T: Uptime> Uptime for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
