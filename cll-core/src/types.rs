//! Core data types shared by the capture, throttle and decode paths.

use core::ops::{Index, Not};

/// Number of timed values in one Link Live frame.
pub const FRAME_LEN: usize = 11;

/// Maximum number of ESCs a single link can drive.
pub const MAX_ESCS: usize = 4;

/// Meaning of each position in a [`RawFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameSlot {
    /// Calibration pulse; every other slot is a ratio against it.
    Reference = 0,
    Voltage = 1,
    RippleVoltage = 2,
    Current = 3,
    Throttle = 4,
    OutputPower = 5,
    Rpm = 6,
    BecVoltage = 7,
    BecCurrent = 8,
    /// Linear temperature sensor, or the offset calibration pulse.
    LinearTemp = 9,
    /// NTC thermistor, or the offset calibration pulse.
    NtcTemp = 10,
}

impl FrameSlot {
    /// All slots in frame order.
    pub const ALL: [FrameSlot; FRAME_LEN] = [
        FrameSlot::Reference,
        FrameSlot::Voltage,
        FrameSlot::RippleVoltage,
        FrameSlot::Current,
        FrameSlot::Throttle,
        FrameSlot::OutputPower,
        FrameSlot::Rpm,
        FrameSlot::BecVoltage,
        FrameSlot::BecCurrent,
        FrameSlot::LinearTemp,
        FrameSlot::NtcTemp,
    ];

    /// Position of this slot inside a frame.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One complete set of captured tick values for a single ESC.
///
/// A zero reference means the frame never completed and carries no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    pub ticks: [u16; FRAME_LEN],
}

impl RawFrame {
    /// A frame with every slot cleared.
    pub const EMPTY: RawFrame = RawFrame {
        ticks: [0; FRAME_LEN],
    };

    #[inline]
    #[must_use]
    pub const fn new(ticks: [u16; FRAME_LEN]) -> Self {
        Self { ticks }
    }

    /// Tick count of the given slot.
    #[inline]
    #[must_use]
    pub const fn slot(&self, slot: FrameSlot) -> u16 {
        self.ticks[slot as usize]
    }

    /// Tick count of the calibration pulse.
    #[inline]
    #[must_use]
    pub const fn reference(&self) -> u16 {
        self.ticks[0]
    }

    /// True when the frame carries a usable reference.
    #[inline]
    #[must_use]
    pub const fn has_reference(&self) -> bool {
        self.ticks[0] != 0
    }
}

impl Index<FrameSlot> for RawFrame {
    type Output = u16;

    fn index(&self, slot: FrameSlot) -> &u16 {
        &self.ticks[slot.index()]
    }
}

/// Logic level of a signal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Where the throttle pulses come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThrottleSource {
    /// Pulses are synthesized from the level set by the application.
    Generate,
    /// Pulses are mirrored from an external receiver on the given input pin.
    Measure(u8),
}

impl ThrottleSource {
    #[inline]
    #[must_use]
    pub const fn mode(self) -> ThrottleMode {
        match self {
            ThrottleSource::Generate => ThrottleMode::Generated,
            ThrottleSource::Measure(_) => ThrottleMode::Measured,
        }
    }
}

/// Operating mode of the throttle engine, without the pin detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThrottleMode {
    Generated,
    Measured,
}
