//! Timing configuration and the tick budgets derived from it.
//!
//! Every duration is kept in microseconds (or milliseconds for the long
//! timeouts) and converted with the platform's tick rate, so the same
//! engine runs on a 2 MHz AVR-style prescaled timer or a 1 MHz monotonic
//! clock.

/// Default throttle pulse for level 0.
pub const DEFAULT_MIN_PULSE_US: u16 = 1000;
/// Default throttle pulse for level 100.
pub const DEFAULT_MAX_PULSE_US: u16 = 2000;

/// Timing constants for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Rate of the tick clock in Hz.
    pub tick_hz: u32,
    /// Throttle pulse period in generating mode.
    pub throttle_period_us: u32,
    /// Gap after which the current frame is considered finished.
    pub frame_reset_us: u32,
    /// How long the throttle signal may be absent before it is declared lost.
    pub signal_timeout_ms: u32,
    /// Number of distinct counter values before the tick clock wraps.
    pub counter_resolution: u32,
    /// Level applied when arming in generating mode.
    pub arm_level: u8,
}

impl TimingConfig {
    /// Defaults for a 2 MHz tick clock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tick_hz: 2_000_000,
            throttle_period_us: 20_000,
            frame_reset_us: 6_000,
            signal_timeout_ms: 1_000,
            counter_resolution: 65_536,
            arm_level: 50,
        }
    }

    /// Defaults with a different tick rate.
    #[must_use]
    pub const fn with_tick_hz(tick_hz: u32) -> Self {
        let mut config = Self::new();
        config.tick_hz = tick_hz;
        config
    }

    /// Convert microseconds to clock ticks, truncating.
    #[inline]
    #[must_use]
    pub const fn us_to_ticks(&self, us: u32) -> u32 {
        (us as u64 * self.tick_hz as u64 / 1_000_000) as u32
    }

    /// Frame reset gap in ticks, clamped to the counter range.
    #[must_use]
    pub const fn reset_ticks(&self) -> u16 {
        saturate(self.us_to_ticks(self.frame_reset_us))
    }

    /// Throttle period in ticks. `None` if the period does not fit the counter.
    #[must_use]
    pub const fn period_ticks(&self) -> Option<u16> {
        let ticks = self.us_to_ticks(self.throttle_period_us);
        if ticks == 0 || ticks > u16::MAX as u32 {
            None
        } else {
            Some(ticks as u16)
        }
    }

    /// Consecutive counter wraps without an edge before the external signal is lost.
    #[must_use]
    pub const fn max_overflow(&self) -> u16 {
        let timeout_ticks = self.signal_timeout_ms as u64 * self.tick_hz as u64 / 1_000;
        let resolution = self.counter_resolution as u64;
        if resolution == 0 {
            return 1;
        }
        let wraps = timeout_ticks.div_ceil(resolution);
        if wraps == 0 {
            1
        } else if wraps > u16::MAX as u64 {
            u16::MAX
        } else {
            wraps as u16
        }
    }

    /// Generated periods without a fresh level before the signal is dropped.
    #[must_use]
    pub const fn max_missed_periods(&self) -> u16 {
        if self.throttle_period_us == 0 {
            return 1;
        }
        let periods = self.signal_timeout_ms as u64 * 1_000 / self.throttle_period_us as u64;
        if periods == 0 {
            1
        } else if periods > u16::MAX as u64 {
            u16::MAX
        } else {
            periods as u16
        }
    }

    /// How long a blocking snapshot waits for the watchdog to release it.
    #[inline]
    #[must_use]
    pub const fn snapshot_timeout_ms(&self) -> u32 {
        self.signal_timeout_ms / 2
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::new()
    }
}

const fn saturate(ticks: u32) -> u16 {
    if ticks > u16::MAX as u32 {
        u16::MAX
    } else {
        ticks as u16
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = TimingConfig::new();
        assert_eq!(config.reset_ticks(), 12_000);
        assert_eq!(config.period_ticks(), Some(40_000));
        // 2_000_000 ticks / 65_536 = 30.5 -> 31 wraps
        assert_eq!(config.max_overflow(), 31);
        assert_eq!(config.max_missed_periods(), 50);
        assert_eq!(config.snapshot_timeout_ms(), 500);
    }

    #[test]
    fn test_one_megahertz_clock() {
        let config = TimingConfig::with_tick_hz(1_000_000);
        assert_eq!(config.us_to_ticks(1000), 1000);
        assert_eq!(config.reset_ticks(), 6_000);
        assert_eq!(config.period_ticks(), Some(20_000));
        assert_eq!(config.max_overflow(), 16);
    }

    #[test]
    fn test_period_must_fit_counter() {
        let config = TimingConfig::with_tick_hz(4_000_000);
        assert_eq!(config.period_ticks(), None);
    }

    #[test]
    fn test_reset_ticks_saturate() {
        let mut config = TimingConfig::new();
        config.frame_reset_us = 100_000;
        assert_eq!(config.reset_ticks(), u16::MAX);
    }
}
