//! Frame boundary detection.
//!
//! The watchdog compare fires once the frame reset time has passed since the
//! tick clock was last cleared. By then any ESC pulse for this period has
//! arrived, so the lines are taken back and every channel is settled.

use crate::flags::TimingFlags;
use crate::frame::ChannelState;
use crate::hal::LineDriver;
use crate::types::Level;

/// Run one watchdog step over the configured channels.
///
/// Returns a bit mask of the ESCs whose pending snapshot was released.
pub fn run<L: LineDriver>(lines: &mut L, channels: &mut [ChannelState], flags: &TimingFlags) -> u8 {
    lines.mute();
    lines.drive(Level::High);

    let mut released = 0u8;
    for (index, channel) in channels.iter_mut().enumerate() {
        if channel.settle() {
            flags.clear_busy(index);
            released |= 1 << index;
        }
    }
    released
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::hal::LineDriver;
    use crate::mock::MockPlatform;
    use crate::types::FRAME_LEN;

    #[test]
    fn test_takes_lines_back() {
        let mut platform = MockPlatform::new();
        platform.configure(1);
        platform.listen();
        let mut channels = [ChannelState::new()];
        let flags = TimingFlags::new();

        run(&mut platform, &mut channels, &flags);

        assert!(!platform.is_capturing());
        assert!(!platform.is_listening());
        assert_eq!(platform.level(), Level::High);
    }

    #[test]
    fn test_releases_only_complete_channels() {
        let mut platform = MockPlatform::new();
        platform.configure(2);
        let mut channels = [ChannelState::new(), ChannelState::new()];
        let flags = TimingFlags::new();
        flags.set_busy(0);
        flags.set_busy(1);

        for i in 0..FRAME_LEN as u16 {
            channels[0].record(100 + i);
        }
        for i in 0..5 {
            channels[1].record(100 + i);
        }

        assert_eq!(run(&mut platform, &mut channels, &flags), 0);
        assert_eq!(run(&mut platform, &mut channels, &flags), 0b01);
        assert!(!flags.is_busy(0));
        assert!(flags.is_busy(1));
    }
}
