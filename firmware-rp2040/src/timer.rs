//! 16-bit tick counter emulated on top of the embassy time driver.
//!
//! The RP2040 timer is a free-running 64-bit microsecond counter, so the
//! link's counter is kept as a base instant: the counter value is the time
//! since the base, truncated to 16 bits. Compare channels and the overflow
//! become deadlines relative to the base, served by [`run`] on the
//! high-priority executor.

use cll_core::{CastleLink, Compare, EventSource, Platform, Uptime};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};
use portable_atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicU8, Ordering};

/// Ticks per counter pass.
pub const COUNTER_SPAN: u64 = 1 << 16;

/// Deadline kinds served by the timer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum TimerEvent {
    Compare(Compare),
    Wrap,
}

/// Counter state shared between the platform and the timer task.
pub struct TimerState {
    /// Time driver ticks at counter value zero.
    base: AtomicU64,
    /// Counter value while stopped.
    frozen: AtomicU16,
    running: AtomicBool,
    compares: [AtomicU16; 2],
    /// One bit per [`EventSource`].
    enabled: AtomicU8,
    /// Compare channels that already fired during this counter pass.
    fired: AtomicU8,
    /// ESC pulse capture enabled.
    capturing: AtomicBool,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl TimerState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: AtomicU64::new(0),
            frozen: AtomicU16::new(0),
            running: AtomicBool::new(false),
            compares: [AtomicU16::new(0), AtomicU16::new(0)],
            enabled: AtomicU8::new(0),
            fired: AtomicU8::new(0),
            capturing: AtomicBool::new(false),
            changed: Signal::new(),
        }
    }

    fn source_bit(source: EventSource) -> u8 {
        1 << source as u8
    }

    fn compare_bit(compare: Compare) -> u8 {
        1 << compare as u8
    }

    fn touch(&self) {
        self.changed.signal(());
    }

    pub fn ticks(&self) -> u16 {
        if self.running.load(Ordering::Acquire) {
            let elapsed = Instant::now().as_ticks().wrapping_sub(self.base.load(Ordering::Acquire));
            elapsed as u16
        } else {
            self.frozen.load(Ordering::Acquire)
        }
    }

    pub fn clear(&self) {
        self.base.store(Instant::now().as_ticks(), Ordering::Release);
        self.frozen.store(0, Ordering::Release);
        self.fired.store(0, Ordering::Release);
        self.touch();
    }

    pub fn start(&self) {
        let frozen = u64::from(self.frozen.load(Ordering::Acquire));
        self.base.store(Instant::now().as_ticks().saturating_sub(frozen), Ordering::Release);
        self.running.store(true, Ordering::Release);
        self.touch();
    }

    pub fn stop(&self) {
        self.frozen.store(self.ticks(), Ordering::Release);
        self.running.store(false, Ordering::Release);
        self.touch();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_compare(&self, compare: Compare, ticks: u16) {
        self.compares[compare as usize].store(ticks, Ordering::Release);
        self.fired.fetch_and(!Self::compare_bit(compare), Ordering::AcqRel);
        self.touch();
    }

    pub fn enable(&self, source: EventSource) {
        self.enabled.fetch_or(Self::source_bit(source), Ordering::AcqRel);
        self.touch();
    }

    pub fn disable(&self, source: EventSource) {
        self.enabled.fetch_and(!Self::source_bit(source), Ordering::AcqRel);
        self.touch();
    }

    pub fn is_enabled(&self, source: EventSource) -> bool {
        self.enabled.load(Ordering::Acquire) & Self::source_bit(source) != 0
    }

    pub fn set_capturing(&self, on: bool) {
        self.capturing.store(on, Ordering::Release);
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    /// Earliest pending deadline, or `None` while the counter is stopped.
    pub fn next_event(&self) -> Option<(TimerEvent, Instant)> {
        if !self.is_running() {
            return None;
        }

        let base = self.base.load(Ordering::Acquire);
        let fired = self.fired.load(Ordering::Acquire);
        let mut next = (TimerEvent::Wrap, base + COUNTER_SPAN);

        for (compare, source) in [
            (Compare::Watchdog, EventSource::Watchdog),
            (Compare::PulseGen, EventSource::PulseGen),
        ] {
            if !self.is_enabled(source) || fired & Self::compare_bit(compare) != 0 {
                continue;
            }
            let at = base + u64::from(self.compares[compare as usize].load(Ordering::Acquire));
            if at < next.1 {
                next = (TimerEvent::Compare(compare), at);
            }
        }

        Some((next.0, Instant::from_ticks(next.1)))
    }

    fn mark_fired(&self, compare: Compare) {
        self.fired.fetch_or(Self::compare_bit(compare), Ordering::AcqRel);
    }

    fn wrap(&self) {
        self.base.fetch_add(COUNTER_SPAN, Ordering::AcqRel);
        self.fired.store(0, Ordering::Release);
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve compare and overflow deadlines forever.
///
/// Any change to the counter or its channels re-plans the next deadline.
pub async fn run<P: Platform, U: Uptime>(link: &CastleLink<'_, P, U>, timer: &TimerState) -> ! {
    loop {
        let Some((event, deadline)) = timer.next_event() else {
            timer.changed.wait().await;
            continue;
        };

        match select(Timer::at(deadline), timer.changed.wait()).await {
            Either::First(()) => match event {
                TimerEvent::Compare(Compare::Watchdog) => {
                    timer.mark_fired(Compare::Watchdog);
                    link.on_watchdog();
                }
                TimerEvent::Compare(Compare::PulseGen) => {
                    timer.mark_fired(Compare::PulseGen);
                    link.on_pulse_timer();
                }
                TimerEvent::Wrap => {
                    timer.wrap();
                    link.on_overflow();
                }
            },
            Either::Second(()) => {}
        }
    }
}
