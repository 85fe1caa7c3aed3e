//! Serial monitor dispatcher.
//!
//! Drives a [`CastleLink`] from host commands and streams telemetry back.
//! The host walks the session through
//! `Hello -> Configuring -> Started -> Armed`; every command gets exactly one
//! response frame.
//!
//! | Command         | Accepted in                 | Effect                          |
//! |-----------------|-----------------------------|---------------------------------|
//! | Noop            | any                         | none                            |
//! | Hello           | any                         | disarm, go to Configuring       |
//! | SetMinPulse etc | Configuring, Started        | store setting                   |
//! | Start           | Configuring, Started        | `begin`, go to Started          |
//! | Arm             | Started, Armed              | `arm` once, go to Armed         |
//! | SetThrottle     | Armed                       | `set_throttle`                  |
//! | Disarm          | any                         | `disarm`, Armed -> Started      |

use cll_core::{
    CastleLink, LinkError, Platform, RawFrame, SnapshotPoll, ThrottleMode, ThrottleSource, Uptime, MAX_ESCS,
};
use embassy_futures::yield_now;

use crate::command::{Command, CommandId, THROTTLE_MODE_EXTERNAL, THROTTLE_MODE_SOFTWARE};
use crate::queue::CommandQueue;
use crate::report::{encode_response, encode_telemetry};
use crate::sink::{ReportSink, SinkError};

/// Shortest throttle pulse the host may configure.
pub const ABSOLUTE_MIN_PULSE_US: u16 = 750;
/// Longest throttle pulse the host may configure.
pub const ABSOLUTE_MAX_PULSE_US: u16 = 2250;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorState {
    /// Waiting for the host handshake.
    Hello,
    /// Handshake done, settings may change.
    Configuring,
    /// Link configured, throttle off.
    Started,
    /// Link running, telemetry streaming.
    Armed,
}

/// Settings collected before `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorConfig {
    pub esc_count: usize,
    pub min_pulse_us: u16,
    pub max_pulse_us: u16,
    pub mode: ThrottleMode,
    /// Board pin wired to the external receiver.
    pub external_pin: u8,
}

impl MonitorConfig {
    #[must_use]
    pub const fn new(external_pin: u8) -> Self {
        Self {
            esc_count: 1,
            min_pulse_us: cll_core::config::DEFAULT_MIN_PULSE_US,
            max_pulse_us: cll_core::config::DEFAULT_MAX_PULSE_US,
            mode: ThrottleMode::Generated,
            external_pin,
        }
    }

    #[must_use]
    pub const fn source(&self) -> ThrottleSource {
        match self.mode {
            ThrottleMode::Generated => ThrottleSource::Generate,
            ThrottleMode::Measured => ThrottleSource::Measure(self.external_pin),
        }
    }
}

/// Command dispatcher for one link.
#[derive(Debug, Clone)]
pub struct Monitor {
    state: MonitorState,
    config: MonitorConfig,
}

impl Monitor {
    #[must_use]
    pub const fn new(external_pin: u8) -> Self {
        Self {
            state: MonitorState::Hello,
            config: MonitorConfig::new(external_pin),
        }
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> MonitorState {
        self.state
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// True while telemetry should be streamed.
    #[inline]
    #[must_use]
    pub const fn is_reporting(&self) -> bool {
        matches!(self.state, MonitorState::Armed)
    }

    const fn is_configurable(&self) -> bool {
        matches!(self.state, MonitorState::Configuring | MonitorState::Started)
    }

    /// Apply one command. Returns `true` to acknowledge it.
    pub fn handle<P: Platform, U: Uptime>(&mut self, link: &CastleLink<'_, P, U>, command: Command) -> bool {
        let ack = match command.id {
            CommandId::Noop => true,
            CommandId::Hello => {
                link.disarm();
                self.state = MonitorState::Configuring;
                true
            }
            CommandId::SetMinPulse => self.is_configurable() && self.set_min_pulse(command.value),
            CommandId::SetMaxPulse => self.is_configurable() && self.set_max_pulse(command.value),
            CommandId::SetThrottleMode => self.is_configurable() && self.set_mode(command.value),
            CommandId::SetEscCount => self.is_configurable() && self.set_esc_count(command.value),
            CommandId::Start => self.is_configurable() && self.start(link),
            CommandId::Arm => match self.state {
                MonitorState::Started => match link.arm() {
                    Ok(()) => {
                        self.state = MonitorState::Armed;
                        true
                    }
                    Err(_) => false,
                },
                // A repeated ARM keeps the running throttle as it is
                MonitorState::Armed => true,
                _ => false,
            },
            CommandId::SetThrottle => {
                if self.state == MonitorState::Armed {
                    link.set_throttle(i32::from(command.value));
                    true
                } else {
                    false
                }
            }
            CommandId::Disarm => {
                link.disarm();
                if self.state == MonitorState::Armed {
                    self.state = MonitorState::Started;
                }
                true
            }
        };

        #[cfg(feature = "defmt")]
        if !ack {
            defmt::warn!("rejected {} in state {}", command, self.state);
        }
        ack
    }

    fn set_min_pulse(&mut self, us: u16) -> bool {
        if !(ABSOLUTE_MIN_PULSE_US..=ABSOLUTE_MAX_PULSE_US).contains(&us) {
            return false;
        }
        self.config.min_pulse_us = us;
        true
    }

    fn set_max_pulse(&mut self, us: u16) -> bool {
        if !(ABSOLUTE_MIN_PULSE_US..=ABSOLUTE_MAX_PULSE_US).contains(&us) {
            return false;
        }
        self.config.max_pulse_us = us;
        true
    }

    fn set_mode(&mut self, value: u16) -> bool {
        self.config.mode = match value {
            THROTTLE_MODE_EXTERNAL => ThrottleMode::Measured,
            THROTTLE_MODE_SOFTWARE => ThrottleMode::Generated,
            _ => return false,
        };
        true
    }

    fn set_esc_count(&mut self, value: u16) -> bool {
        let count = usize::from(value);
        if count == 0 || count > MAX_ESCS {
            return false;
        }
        self.config.esc_count = count;
        true
    }

    fn start<P: Platform, U: Uptime>(&mut self, link: &CastleLink<'_, P, U>) -> bool {
        let config = self.config;
        match link.begin(config.esc_count, config.source(), config.min_pulse_us, config.max_pulse_us) {
            Ok(()) => {
                self.state = MonitorState::Started;
                true
            }
            Err(_) => false,
        }
    }

    /// Handle every queued command, answering each one.
    pub async fn drain<P, U, S>(
        &mut self,
        link: &CastleLink<'_, P, U>,
        queue: &CommandQueue,
        sink: &mut S,
    ) -> Result<usize, SinkError>
    where
        P: Platform,
        U: Uptime,
        S: ReportSink,
    {
        let mut handled = 0;
        while let Some(command) = queue.pop() {
            let ack = self.handle(link, command);
            sink.write(&encode_response(ack)).await?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Send one telemetry frame per configured ESC.
    ///
    /// Waits for each snapshot in turn, yielding while it is pending. ESCs
    /// whose snapshot times out are skipped.
    /// Returns the number of frames written.
    pub async fn report<P, U, S>(&self, link: &CastleLink<'_, P, U>, sink: &mut S) -> Result<usize, SinkError>
    where
        P: Platform,
        U: Uptime,
        S: ReportSink,
    {
        if !self.is_reporting() {
            return Ok(0);
        }

        let mut sent = 0;
        for index in 0..link.esc_count() {
            match snapshot(link, index).await {
                Ok(frame) => {
                    let bytes = encode_telemetry(index as u8, link.is_throttle_present(), &frame);
                    sink.write(&bytes).await?;
                    sent += 1;
                }
                Err(LinkError::Timeout) => {}
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("ESC {} snapshot failed: {}", index, _e);
                }
            }
        }
        Ok(sent)
    }

    /// One foreground pass: answer pending commands, then stream telemetry.
    pub async fn service<P, U, S>(
        &mut self,
        link: &CastleLink<'_, P, U>,
        queue: &CommandQueue,
        sink: &mut S,
    ) -> Result<(), SinkError>
    where
        P: Platform,
        U: Uptime,
        S: ReportSink,
    {
        self.drain(link, queue, sink).await?;
        self.report(link, sink).await?;
        Ok(())
    }
}

/// Wait for the next complete frame of ESC `index` without blocking the executor.
async fn snapshot<P: Platform, U: Uptime>(link: &CastleLink<'_, P, U>, index: usize) -> Result<RawFrame, LinkError> {
    let request = link.request_snapshot(index)?;
    loop {
        match link.poll_snapshot(&request) {
            SnapshotPoll::Ready(frame) => return Ok(frame),
            SnapshotPoll::Pending => yield_now().await,
            SnapshotPoll::TimedOut => return Err(LinkError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::report::{RESPONSE_FRAME_LEN, TELEMETRY_FRAME_LEN};
    use cll_core::mock::{MockPlatform, MockUptime};
    use cll_core::{EventControl, EventSource, LineDriver, TimingConfig, FRAME_LEN};
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::vec::Vec;

    #[derive(Default)]
    struct VecSink {
        frames: Vec<Vec<u8>>,
    }

    impl ReportSink for VecSink {
        fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), SinkError>> {
            self.frames.push(bytes.to_vec());
            core::future::ready(Ok(()))
        }
    }

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn write(&mut self, _bytes: &[u8]) -> impl Future<Output = Result<(), SinkError>> {
            core::future::ready(Err(SinkError::Io))
        }
    }

    fn block_on<F: Future>(mut f: F) -> F::Output {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
        let mut cx = Context::from_waker(&waker);

        // SAFETY: We don't move f after pinning
        let mut f = unsafe { Pin::new_unchecked(&mut f) };

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }

    fn link(uptime: MockUptime) -> CastleLink<'static, MockPlatform, MockUptime> {
        CastleLink::new(MockPlatform::new(), uptime, TimingConfig::new())
    }

    fn run(monitor: &mut Monitor, link: &CastleLink<'_, MockPlatform, MockUptime>, commands: &[Command]) -> Vec<bool> {
        commands.iter().map(|&c| monitor.handle(link, c)).collect()
    }

    fn session() -> [Command; 6] {
        [
            Command::bare(CommandId::Hello),
            Command::new(CommandId::SetEscCount, 2),
            Command::new(CommandId::SetMinPulse, 1000),
            Command::new(CommandId::SetMaxPulse, 2000),
            Command::new(CommandId::SetThrottleMode, THROTTLE_MODE_SOFTWARE),
            Command::bare(CommandId::Start),
        ]
    }

    #[test]
    fn test_handshake_required() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);

        let acks = run(
            &mut monitor,
            &link,
            &[
                Command::new(CommandId::SetEscCount, 2),
                Command::bare(CommandId::Start),
                Command::bare(CommandId::Arm),
                Command::bare(CommandId::Noop),
            ],
        );
        assert_eq!(acks, [false, false, false, true]);
        assert_eq!(monitor.state(), MonitorState::Hello);
    }

    #[test]
    fn test_full_session() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);

        assert!(run(&mut monitor, &link, &session()).iter().all(|&a| a));
        assert_eq!(monitor.state(), MonitorState::Started);
        assert_eq!(link.esc_count(), 2);
        assert!(!monitor.is_reporting());

        assert!(monitor.handle(&link, Command::bare(CommandId::Arm)));
        assert_eq!(monitor.state(), MonitorState::Armed);
        assert!(link.is_armed());
        assert!(monitor.is_reporting());

        assert!(monitor.handle(&link, Command::new(CommandId::SetThrottle, 75)));
        assert_eq!(link.throttle_level(), 75);

        // Settings are frozen while armed
        assert!(!monitor.handle(&link, Command::new(CommandId::SetEscCount, 1)));
        assert!(!monitor.handle(&link, Command::bare(CommandId::Start)));

        assert!(monitor.handle(&link, Command::bare(CommandId::Disarm)));
        assert_eq!(monitor.state(), MonitorState::Started);
        assert!(!link.is_armed());
        link.with_platform(|p| assert_eq!(p.level(), cll_core::Level::High));
    }

    #[test]
    fn test_setting_validation() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);
        monitor.handle(&link, Command::bare(CommandId::Hello));

        let acks = run(
            &mut monitor,
            &link,
            &[
                Command::new(CommandId::SetEscCount, 0),
                Command::new(CommandId::SetEscCount, (MAX_ESCS + 1) as u16),
                Command::new(CommandId::SetMinPulse, 500),
                Command::new(CommandId::SetMaxPulse, 2500),
                Command::new(CommandId::SetThrottleMode, 7),
                Command::new(CommandId::SetMinPulse, 750),
                Command::new(CommandId::SetMaxPulse, 2250),
                Command::new(CommandId::SetThrottleMode, THROTTLE_MODE_EXTERNAL),
            ],
        );
        assert_eq!(acks, [false, false, false, false, false, true, true, true]);
        assert_eq!(monitor.config().min_pulse_us, 750);
        assert_eq!(monitor.config().max_pulse_us, 2250);
        assert_eq!(monitor.config().source(), ThrottleSource::Measure(9));
    }

    #[test]
    fn test_start_failure_keeps_configuring() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);
        monitor.handle(&link, Command::bare(CommandId::Hello));
        monitor.handle(&link, Command::new(CommandId::SetMinPulse, 2000));
        monitor.handle(&link, Command::new(CommandId::SetMaxPulse, 1000));

        assert!(!monitor.handle(&link, Command::bare(CommandId::Start)));
        assert_eq!(monitor.state(), MonitorState::Configuring);
    }

    #[test]
    fn test_unmappable_external_pin() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(2);
        monitor.handle(&link, Command::bare(CommandId::Hello));
        monitor.handle(&link, Command::new(CommandId::SetThrottleMode, THROTTLE_MODE_EXTERNAL));

        assert!(!monitor.handle(&link, Command::bare(CommandId::Start)));
    }

    #[test]
    fn test_hello_resets_armed_session() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);
        run(&mut monitor, &link, &session());
        monitor.handle(&link, Command::bare(CommandId::Arm));

        assert!(monitor.handle(&link, Command::bare(CommandId::Hello)));
        assert_eq!(monitor.state(), MonitorState::Configuring);
        assert!(!link.is_armed());
    }

    #[test]
    fn test_repeated_arm_keeps_throttle() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);
        run(&mut monitor, &link, &session());
        monitor.handle(&link, Command::bare(CommandId::Arm));
        monitor.handle(&link, Command::new(CommandId::SetThrottle, 10));
        assert!(link.is_throttle_present());

        assert!(monitor.handle(&link, Command::bare(CommandId::Arm)));
        assert_eq!(monitor.state(), MonitorState::Armed);
        assert_eq!(link.throttle_level(), 10);
        assert!(link.is_throttle_present());
    }

    #[test]
    fn test_throttle_rejected_unless_armed() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);
        run(&mut monitor, &link, &session());

        assert!(!monitor.handle(&link, Command::new(CommandId::SetThrottle, 40)));
        link.with_platform(|p| assert!(p.is_enabled(EventSource::PulseGen)));
    }

    #[test]
    fn test_drain_answers_every_command() {
        let link = link(MockUptime::new(1));
        let queue = CommandQueue::new();
        let mut monitor = Monitor::new(9);
        let mut sink = VecSink::default();

        queue.push(Command::bare(CommandId::Arm)).unwrap();
        queue.push(Command::bare(CommandId::Hello)).unwrap();
        queue.push(Command::bare(CommandId::Noop)).unwrap();

        let handled = block_on(monitor.drain(&link, &queue, &mut sink)).unwrap();
        assert_eq!(handled, 3);
        assert!(queue.is_empty());
        assert_eq!(sink.frames, [std::vec![0x55, 0xAA], std::vec![0x55, 0xAB], std::vec![0x55, 0xAB]]);
        assert!(sink.frames.iter().all(|f| f.len() == RESPONSE_FRAME_LEN));
    }

    #[test]
    fn test_drain_propagates_sink_error() {
        let link = link(MockUptime::new(1));
        let queue = CommandQueue::new();
        let mut monitor = Monitor::new(9);
        queue.push(Command::bare(CommandId::Noop)).unwrap();

        let result = block_on(monitor.drain(&link, &queue, &mut FailingSink));
        assert_eq!(result, Err(SinkError::Io));
    }

    #[test]
    fn test_report_idle_until_armed() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);
        let mut sink = VecSink::default();
        run(&mut monitor, &link, &session());

        assert_eq!(block_on(monitor.report(&link, &mut sink)), Ok(0));
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_report_skips_timed_out_escs() {
        let link = link(MockUptime::new(1));
        let mut monitor = Monitor::new(9);
        let mut sink = VecSink::default();
        run(&mut monitor, &link, &session());
        monitor.handle(&link, Command::bare(CommandId::Arm));

        assert_eq!(block_on(monitor.report(&link, &mut sink)), Ok(0));
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_report_streams_released_frames() {
        let link = link(MockUptime::frozen());
        let queue = CommandQueue::new();
        let mut monitor = Monitor::new(9);
        let mut sink = VecSink::default();

        for command in session() {
            queue.push(command).unwrap();
        }
        queue.push(Command::bare(CommandId::Arm)).unwrap();
        queue.push(Command::new(CommandId::SetThrottle, 20)).unwrap();
        block_on(monitor.drain(&link, &queue, &mut sink)).unwrap();
        sink.frames.clear();

        let done = AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    for esc in 0..2 {
                        for i in 0..FRAME_LEN as u16 {
                            link.with_platform(|p| p.set_ticks(1000 + 100 * i));
                            link.on_capture(esc);
                        }
                    }
                    link.on_watchdog();
                    link.on_watchdog();
                    std::thread::yield_now();
                }
            });

            let sent = block_on(monitor.report(&link, &mut sink));
            done.store(true, Ordering::Release);
            assert_eq!(sent, Ok(2));
        });

        assert_eq!(sink.frames.len(), 2);
        for (esc, frame) in sink.frames.iter().enumerate() {
            assert_eq!(frame.len(), TELEMETRY_FRAME_LEN);
            assert_eq!(frame[0], 0xFF);
            assert_eq!(frame[1], 0xF0 | 0x08 | esc as u8);
            assert_eq!(&frame[2..4], &1000u16.to_be_bytes());
        }
    }
}
