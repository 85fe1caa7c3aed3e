//! RP2040 implementation of the link's hardware seams.
//!
//! The ESC lines are switched as a group through the SIO set/clear
//! registers, so a direction or level change hits every line in the same
//! cycle. Edge detection stays with the [`Input`](embassy_rp::gpio::Input)
//! handles owned by the capture tasks; the pads keep reporting the line
//! level whether or not the output driver is enabled.

use cll_core::{Compare, EventControl, EventSource, Level, LineDriver, TickClock, Uptime};
use embassy_rp::pac;
use embassy_time::Instant;

use crate::timer::TimerState;

/// Board glue for one set of ESC lines sharing a tick counter.
pub struct Rp2040Platform {
    timer: &'static TimerState,
    /// GPIO numbers of the ESC lines, in ESC order.
    pins: &'static [u8],
    /// Bit mask of the configured lines.
    mask: u32,
    level: Level,
    throttle_pin: u8,
}

impl Rp2040Platform {
    #[must_use]
    pub const fn new(timer: &'static TimerState, pins: &'static [u8], throttle_pin: u8) -> Self {
        Self {
            timer,
            pins,
            mask: 0,
            level: Level::High,
            throttle_pin,
        }
    }

    fn set_out(&self, level: Level) {
        let out = pac::SIO.gpio_out(0);
        match level {
            Level::High => out.value_set().write_value(self.mask),
            Level::Low => out.value_clr().write_value(self.mask),
        }
    }
}

impl TickClock for Rp2040Platform {
    fn ticks(&self) -> u16 {
        self.timer.ticks()
    }

    fn clear(&mut self) {
        self.timer.clear();
    }

    fn start(&mut self) {
        self.timer.start();
    }

    fn stop(&mut self) {
        self.timer.stop();
    }

    fn is_running(&self) -> bool {
        self.timer.is_running()
    }
}

impl LineDriver for Rp2040Platform {
    fn configure(&mut self, esc_count: usize) {
        self.mask = self
            .pins
            .iter()
            .take(esc_count)
            .fold(0, |mask, pin| mask | (1u32 << *pin));
        self.timer.set_capturing(false);
        self.drive(Level::High);
    }

    fn drive(&mut self, level: Level) {
        // Own edges must not reach the capture tasks.
        self.timer.set_capturing(false);
        self.set_out(level);
        pac::SIO.gpio_oe(0).value_set().write_value(self.mask);
        self.level = level;
    }

    fn listen(&mut self) {
        pac::SIO.gpio_oe(0).value_clr().write_value(self.mask);
        self.timer.set_capturing(true);
    }

    fn mute(&mut self) {
        self.timer.set_capturing(false);
    }

    fn level(&self) -> Level {
        self.level
    }
}

impl EventControl for Rp2040Platform {
    fn set_compare(&mut self, compare: Compare, ticks: u16) {
        self.timer.set_compare(compare, ticks);
    }

    fn enable(&mut self, source: EventSource) {
        self.timer.enable(source);
    }

    fn disable(&mut self, source: EventSource) {
        self.timer.disable(source);
    }

    fn is_enabled(&self, source: EventSource) -> bool {
        self.timer.is_enabled(source)
    }

    fn bind_throttle_input(&mut self, pin: u8) -> bool {
        pin == self.throttle_pin
    }
}

/// Millisecond uptime from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyUptime;

impl Uptime for EmbassyUptime {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
