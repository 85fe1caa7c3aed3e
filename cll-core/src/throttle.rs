//! Throttle pulse generation and external signal measurement.
//!
//! The ESC line carries an inverted copy of a servo pulse: low for the
//! throttle pulse, released high for the rest of the period. While the line
//! is released the ESC answers with its own pulse, which is what the frame
//! capture times.
//!
//! In generating mode the engine toggles the lines from the pulse timer. In
//! measuring mode it mirrors the edges of an external receiver. Both modes
//! count failure events and drop the lines to a safe high level once the
//! signal has been missing for the configured timeout.
//!
//! Every handler returns the presence transition it caused, if any, so the
//! caller can notify the application after updating state.

use crate::config::TimingConfig;
use crate::error::LinkError;
use crate::flags::TimingFlags;
use crate::hal::{Compare, EventSource, Platform};
use crate::types::{Level, ThrottleMode};

/// Highest throttle level.
pub const MAX_LEVEL: u8 = 100;

/// Throttle state of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleEngine {
    mode: ThrottleMode,
    level: u8,
    min_ticks: u16,
    interval_ticks: u16,
    period_ticks: u16,
    pulse_ticks: u16,
    idle_ticks: u16,
    fail_count: u16,
    max_overflow: u16,
    max_missed_periods: u16,
    arm_level: u8,
}

impl ThrottleEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: ThrottleMode::Generated,
            level: 0,
            min_ticks: 0,
            interval_ticks: 0,
            period_ticks: 0,
            pulse_ticks: 0,
            idle_ticks: 0,
            fail_count: 0,
            max_overflow: 1,
            max_missed_periods: 1,
            arm_level: 0,
        }
    }

    /// Derive tick budgets for the given mode and pulse bounds.
    pub fn configure(
        &mut self,
        mode: ThrottleMode,
        timing: &TimingConfig,
        min_pulse_us: u16,
        max_pulse_us: u16,
    ) -> Result<(), LinkError> {
        let period_ticks = timing.period_ticks().ok_or(LinkError::InvalidPulseRange)?;
        let min_ticks = timing.us_to_ticks(u32::from(min_pulse_us));
        let max_ticks = timing.us_to_ticks(u32::from(max_pulse_us));

        if min_pulse_us == 0 || min_ticks >= max_ticks || max_ticks >= u32::from(period_ticks) {
            return Err(LinkError::InvalidPulseRange);
        }

        *self = Self {
            mode,
            level: 0,
            min_ticks: min_ticks as u16,
            interval_ticks: (max_ticks - min_ticks) as u16,
            period_ticks,
            pulse_ticks: min_ticks as u16,
            idle_ticks: period_ticks - min_ticks as u16,
            fail_count: 0,
            max_overflow: timing.max_overflow(),
            max_missed_periods: timing.max_missed_periods(),
            arm_level: timing.arm_level.min(MAX_LEVEL),
        };
        Ok(())
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ThrottleMode {
        self.mode
    }

    /// Last applied level, 0..=100.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Duration of the throttle pulse in ticks.
    #[inline]
    #[must_use]
    pub const fn pulse_ticks(&self) -> u16 {
        self.pulse_ticks
    }

    /// Remainder of the period after the throttle pulse.
    #[inline]
    #[must_use]
    pub const fn idle_ticks(&self) -> u16 {
        self.idle_ticks
    }

    #[inline]
    #[must_use]
    pub const fn period_ticks(&self) -> u16 {
        self.period_ticks
    }

    #[inline]
    #[must_use]
    pub const fn fail_count(&self) -> u16 {
        self.fail_count
    }

    /// Prepare the throttle path before the clock starts. Presence is reset
    /// silently; the first pulse or edge reports it again.
    pub fn arm<P: Platform>(&mut self, platform: &mut P, flags: &TimingFlags) {
        match self.mode {
            ThrottleMode::Generated => self.apply(i32::from(self.arm_level), platform),
            ThrottleMode::Measured => {
                self.fail_count = 0;
                platform.enable(EventSource::Overflow);
                platform.enable(EventSource::ThrottleEdge);
            }
        }
        flags.clear_present();
    }

    /// Apply a new level in generating mode. Ignored while measuring.
    pub fn set_level<P: Platform>(
        &mut self,
        level: i32,
        platform: &mut P,
        flags: &TimingFlags,
    ) -> Option<bool> {
        if self.mode != ThrottleMode::Generated {
            return None;
        }
        self.apply(level, platform);
        if platform.is_running() {
            acquire(flags)
        } else {
            None
        }
    }

    fn apply<P: Platform>(&mut self, level: i32, platform: &mut P) {
        self.fail_count = 0;
        self.level = level.clamp(0, i32::from(MAX_LEVEL)) as u8;

        let step = u32::from(self.interval_ticks) * u32::from(self.level) / u32::from(MAX_LEVEL);
        self.pulse_ticks = self.min_ticks + step as u16;
        self.idle_ticks = self.period_ticks.saturating_sub(self.pulse_ticks);

        if !platform.is_enabled(EventSource::PulseGen) {
            platform.clear();
            platform.set_compare(Compare::PulseGen, self.period_ticks);
            platform.enable(EventSource::PulseGen);
        }
    }

    /// Pulse timer compare in generating mode: flip the lines and schedule
    /// the next edge.
    pub fn on_pulse_timer<P: Platform>(
        &mut self,
        platform: &mut P,
        flags: &TimingFlags,
    ) -> Option<bool> {
        if self.mode != ThrottleMode::Generated || !platform.is_enabled(EventSource::PulseGen) {
            return None;
        }

        let next = !platform.level();
        platform.clear();
        platform.drive(next);

        match next {
            Level::Low => platform.set_compare(Compare::PulseGen, self.pulse_ticks),
            Level::High => {
                platform.set_compare(Compare::PulseGen, self.idle_ticks);
                platform.listen();
                self.fail_count = self.fail_count.saturating_add(1);
            }
        }

        if self.fail_count >= self.max_missed_periods {
            platform.disable(EventSource::PulseGen);
            platform.drive(Level::High);
            return lose(flags);
        }
        None
    }

    /// Edge on the external throttle input in measuring mode.
    pub fn on_edge<P: Platform>(
        &mut self,
        edge: Level,
        platform: &mut P,
        flags: &TimingFlags,
    ) -> Option<bool> {
        if self.mode != ThrottleMode::Measured {
            return None;
        }

        match edge {
            Level::High => {
                platform.drive(Level::Low);
                platform.clear();
            }
            Level::Low => {
                platform.drive(Level::High);
                platform.clear();
                platform.listen();
            }
        }

        self.fail_count = 0;
        acquire(flags)
    }

    /// Tick counter wrapped without an edge in measuring mode.
    pub fn on_overflow<P: Platform>(&mut self, platform: &mut P, flags: &TimingFlags) -> Option<bool> {
        if self.mode != ThrottleMode::Measured {
            return None;
        }

        self.fail_count = self.fail_count.saturating_add(1);
        if self.fail_count >= self.max_overflow {
            self.fail_count = 0;
            platform.mute();
            platform.drive(Level::High);
            return lose(flags);
        }
        None
    }

    /// Drop presence, e.g. on disarm.
    pub fn release(&mut self, flags: &TimingFlags) -> Option<bool> {
        self.fail_count = 0;
        lose(flags)
    }
}

impl Default for ThrottleEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn acquire(flags: &TimingFlags) -> Option<bool> {
    if flags.is_present() {
        None
    } else {
        flags.set_present();
        Some(true)
    }
}

fn lose(flags: &TimingFlags) -> Option<bool> {
    if flags.is_present() {
        flags.clear_present();
        Some(false)
    } else {
        None
    }
}
