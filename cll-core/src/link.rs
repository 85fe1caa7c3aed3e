//! The link facade.
//!
//! [`CastleLink`] is shared between the interrupt handlers of a board and
//! the application. All mutable state sits behind one critical-section
//! mutex; the busy and presence flags sit outside it so a blocking snapshot
//! can spin on them without holding the lock.
//!
//! # Example
//!
//! ```rust,ignore
//! static LINK: CastleLink<'static, Board, BoardUptime> =
//!     CastleLink::new(Board::new(), BoardUptime, TimingConfig::new());
//!
//! LINK.begin(1, ThrottleSource::Generate, 1000, 2000)?;
//! LINK.arm()?;
//! LINK.set_throttle(10);
//! let telemetry = LINK.get_telemetry(0)?;
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::config::TimingConfig;
use crate::decoder::{decode, Telemetry};
use crate::error::LinkError;
use crate::flags::TimingFlags;
use crate::frame::ChannelState;
use crate::hal::{Compare, EventSource, Platform, Uptime};
use crate::presence::PresenceHandler;
use crate::snapshot::{SnapshotPoll, SnapshotRequest};
use crate::throttle::ThrottleEngine;
use crate::types::{Level, RawFrame, ThrottleMode, ThrottleSource, MAX_ESCS};
use crate::watchdog;

struct LinkState<'h, P> {
    platform: P,
    timing: TimingConfig,
    throttle: ThrottleEngine,
    channels: [ChannelState; MAX_ESCS],
    /// Zero until `begin` succeeds.
    esc_count: usize,
    handler: Option<&'h dyn PresenceHandler>,
}

impl<P> LinkState<'_, P> {
    fn notify(&self, change: Option<bool>) {
        let Some(present) = change else {
            return;
        };
        if present {
            info!("throttle signal present");
        } else {
            warn!("throttle signal lost");
        }
        if let Some(handler) = self.handler {
            handler.presence_changed(present);
        }
    }
}

/// Castle Link Live engine for up to [`MAX_ESCS`] ESCs.
pub struct CastleLink<'h, P, U> {
    uptime: U,
    flags: TimingFlags,
    state: Mutex<RefCell<LinkState<'h, P>>>,
}

impl<'h, P, U> CastleLink<'h, P, U> {
    /// Create an unconfigured link. Nothing touches the platform until
    /// [`begin`](Self::begin).
    #[must_use]
    pub const fn new(platform: P, uptime: U, timing: TimingConfig) -> Self {
        Self {
            uptime,
            flags: TimingFlags::new(),
            state: Mutex::new(RefCell::new(LinkState {
                platform,
                timing,
                throttle: ThrottleEngine::new(),
                channels: [ChannelState::new(); MAX_ESCS],
                esc_count: 0,
                handler: None,
            })),
        }
    }
}

impl<'h, P: Platform, U: Uptime> CastleLink<'h, P, U> {
    fn with_state<R>(&self, f: impl FnOnce(&mut LinkState<'h, P>, &TimingFlags) -> R) -> R {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            f(&mut state, &self.flags)
        })
    }

    /// Run `f` with exclusive access to the platform.
    pub fn with_platform<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        self.with_state(|state, _| f(&mut state.platform))
    }

    /// Configure the link for `esc_count` ESCs and the given throttle source.
    ///
    /// Leaves the lines driven high with the clock stopped; call
    /// [`arm`](Self::arm) to start. Fails without touching the platform if
    /// any argument is invalid or the link is armed.
    pub fn begin(
        &self,
        esc_count: usize,
        source: ThrottleSource,
        min_pulse_us: u16,
        max_pulse_us: u16,
    ) -> Result<(), LinkError> {
        if esc_count == 0 || esc_count > MAX_ESCS {
            warn!("invalid ESC count {}", esc_count);
            return Err(LinkError::InvalidEscCount);
        }

        self.with_state(|state, flags| {
            if state.platform.is_running() {
                return Err(LinkError::AlreadyArmed);
            }

            let mut throttle = ThrottleEngine::new();
            throttle.configure(source.mode(), &state.timing, min_pulse_us, max_pulse_us)?;

            if let ThrottleSource::Measure(pin) = source {
                if !state.platform.bind_throttle_input(pin) {
                    warn!("pin {} cannot raise edge interrupts", pin);
                    return Err(LinkError::UnmappablePin);
                }
            }

            let platform = &mut state.platform;
            platform.stop();
            platform.clear();
            for event in [
                EventSource::Watchdog,
                EventSource::PulseGen,
                EventSource::Overflow,
                EventSource::ThrottleEdge,
            ] {
                platform.disable(event);
            }
            platform.configure(esc_count);
            platform.set_compare(Compare::Watchdog, state.timing.reset_ticks());
            platform.enable(EventSource::Watchdog);

            match source.mode() {
                ThrottleMode::Generated => {
                    platform.set_compare(Compare::PulseGen, throttle.period_ticks());
                    platform.enable(EventSource::PulseGen);
                }
                ThrottleMode::Measured => platform.enable(EventSource::Overflow),
            }

            state.channels = [ChannelState::new(); MAX_ESCS];
            state.throttle = throttle;
            state.esc_count = esc_count;
            flags.reset();

            info!(
                "link configured: {} ESC(s), {}, pulse {}..{} us",
                esc_count,
                source,
                min_pulse_us,
                max_pulse_us
            );
            Ok(())
        })
    }

    /// Start the tick clock and the throttle path.
    ///
    /// In generating mode the arm level is applied without a presence
    /// notification; the next [`set_throttle`](Self::set_throttle) reports it.
    /// Fails with [`LinkError::AlreadyArmed`] while running, leaving the
    /// throttle level and presence untouched.
    pub fn arm(&self) -> Result<(), LinkError> {
        self.with_state(|state, flags| {
            if state.esc_count == 0 {
                return Err(LinkError::NotStarted);
            }
            if state.platform.is_running() {
                return Err(LinkError::AlreadyArmed);
            }
            // Frames cut short by a disarm must not continue.
            for channel in &mut state.channels {
                channel.reset();
            }
            state.throttle.arm(&mut state.platform, flags);
            state.platform.start();
            info!("link armed");
            Ok(())
        })
    }

    /// Stop everything and leave the lines driven high. Safe at any time.
    pub fn disarm(&self) {
        self.with_state(|state, flags| {
            let platform = &mut state.platform;
            platform.stop();
            platform.disable(EventSource::ThrottleEdge);
            platform.disable(EventSource::PulseGen);
            platform.disable(EventSource::Overflow);
            platform.mute();
            platform.drive(Level::High);

            let change = state.throttle.release(flags);
            state.notify(change);
            info!("link disarmed");
        });
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.with_state(|state, _| state.platform.is_running())
    }

    /// Set the generated throttle level, clamped to 0..=100. Ignored when
    /// the throttle is measured or the link is not configured.
    pub fn set_throttle(&self, level: i32) {
        self.with_state(|state, flags| {
            if state.esc_count == 0 {
                return;
            }
            let change = state.throttle.set_level(level, &mut state.platform, flags);
            state.notify(change);
        });
    }

    /// Register the presence callback, replacing any previous one.
    pub fn attach_presence_handler(&self, handler: &'h dyn PresenceHandler) {
        self.with_state(|state, _| state.handler = Some(handler));
    }

    #[must_use]
    pub fn is_throttle_present(&self) -> bool {
        self.flags.is_present()
    }

    /// Last applied throttle level.
    #[must_use]
    pub fn throttle_level(&self) -> u8 {
        self.with_state(|state, _| state.throttle.level())
    }

    /// Current throttle pulse width in ticks.
    #[must_use]
    pub fn pulse_ticks(&self) -> u16 {
        self.with_state(|state, _| state.throttle.pulse_ticks())
    }

    /// `None` until [`begin`](Self::begin) succeeds.
    #[must_use]
    pub fn throttle_mode(&self) -> Option<ThrottleMode> {
        self.with_state(|state, _| (state.esc_count != 0).then(|| state.throttle.mode()))
    }

    /// Number of configured ESCs, zero before [`begin`](Self::begin).
    #[must_use]
    pub fn esc_count(&self) -> usize {
        self.with_state(|state, _| state.esc_count)
    }

    #[must_use]
    pub fn timing(&self) -> TimingConfig {
        self.with_state(|state, _| state.timing)
    }

    /// Register interest in the next complete frame of ESC `index`.
    pub fn request_snapshot(&self, index: usize) -> Result<SnapshotRequest, LinkError> {
        let timeout_ms = self.with_state(|state, _| {
            if state.esc_count == 0 {
                Err(LinkError::NotStarted)
            } else if index >= state.esc_count {
                Err(LinkError::InvalidIndex)
            } else {
                Ok(state.timing.snapshot_timeout_ms())
            }
        })?;

        self.flags.set_busy(index);
        Ok(SnapshotRequest::new(index, self.uptime.now_ms(), timeout_ms))
    }

    /// Check a pending request without blocking.
    pub fn poll_snapshot(&self, request: &SnapshotRequest) -> SnapshotPoll {
        let index = request.index();
        if !self.flags.is_busy(index) {
            let frame = self.with_state(|state, _| *state.channels[index].frame());
            return SnapshotPoll::Ready(frame);
        }

        if request.is_expired(self.uptime.now_ms()) {
            SnapshotPoll::TimedOut
        } else {
            SnapshotPoll::Pending
        }
    }

    /// Wait for the next complete frame of ESC `index` and copy it out.
    ///
    /// Busy-waits for up to half the signal timeout. Must not be called from
    /// a context that blocks the watchdog interrupt.
    pub fn get_raw_frame(&self, index: usize) -> Result<RawFrame, LinkError> {
        let request = self.request_snapshot(index)?;
        loop {
            match self.poll_snapshot(&request) {
                SnapshotPoll::Ready(frame) => return Ok(frame),
                SnapshotPoll::Pending => core::hint::spin_loop(),
                SnapshotPoll::TimedOut => {
                    debug!("snapshot of ESC {} timed out", index);
                    return Err(LinkError::Timeout);
                }
            }
        }
    }

    /// Wait for the next complete frame of ESC `index` and decode it.
    pub fn get_telemetry(&self, index: usize) -> Result<Telemetry, LinkError> {
        let frame = self.get_raw_frame(index)?;
        Ok(decode(&frame)?)
    }

    /// ESC pulse captured on line `index`.
    pub fn on_capture(&self, index: usize) {
        self.with_state(|state, _| {
            if index >= state.esc_count || !state.platform.is_running() {
                return;
            }
            let ticks = state.platform.ticks();
            if state.channels[index].record(ticks) {
                trace!("ESC {} pulse at {} ticks", index, ticks);
            } else {
                debug!("ESC {} overran its frame, pulse at {} ticks dropped", index, ticks);
            }
        });
    }

    /// Watchdog compare: the frame reset time passed since the last clear.
    pub fn on_watchdog(&self) {
        self.with_state(|state, flags| {
            if state.esc_count == 0 {
                return;
            }
            let count = state.esc_count;
            let released = watchdog::run(&mut state.platform, &mut state.channels[..count], flags);
            if released != 0 {
                trace!("snapshots released: {=u8:b}", released);
            }
        });
    }

    /// Pulse generation compare.
    pub fn on_pulse_timer(&self) {
        self.with_state(|state, flags| {
            let change = state.throttle.on_pulse_timer(&mut state.platform, flags);
            state.notify(change);
        });
    }

    /// Edge on the external throttle input; `level` is the level after the edge.
    pub fn on_throttle_edge(&self, level: Level) {
        self.with_state(|state, flags| {
            if !state.platform.is_enabled(EventSource::ThrottleEdge) {
                return;
            }
            let change = state.throttle.on_edge(level, &mut state.platform, flags);
            state.notify(change);
        });
    }

    /// Tick counter wrapped.
    pub fn on_overflow(&self) {
        self.with_state(|state, flags| {
            if !state.platform.is_enabled(EventSource::Overflow) {
                return;
            }
            let change = state.throttle.on_overflow(&mut state.platform, flags);
            state.notify(change);
        });
    }
}
