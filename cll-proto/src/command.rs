//! Host-to-device command frames.
//!
//! ```text
//! +--------+----+-----------+------------+----------+
//! | 0x00   | id | value LSB | value MSB  | checksum |
//! +--------+----+-----------+------------+----------+
//! ```
//!
//! The checksum is the XOR of `id`, `value LSB` and `value MSB`.

use crate::checksum::xor_checksum;

/// First byte of every command frame.
pub const COMMAND_HEADER: u8 = 0x00;

/// Length of a command frame on the wire.
pub const COMMAND_FRAME_LEN: usize = 5;

/// `SetThrottleMode` value selecting an external receiver.
pub const THROTTLE_MODE_EXTERNAL: u16 = 0;

/// `SetThrottleMode` value selecting generated pulses.
pub const THROTTLE_MODE_SOFTWARE: u16 = 1;

/// Command identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandId {
    Noop = 0x00,
    Hello = 0x01,
    SetMinPulse = 0x02,
    SetMaxPulse = 0x03,
    SetThrottleMode = 0x04,
    SetEscCount = 0x05,
    Start = 0x06,
    Arm = 0x07,
    SetThrottle = 0x08,
    Disarm = 0x09,
}

impl TryFrom<u8> for CommandId {
    type Error = CommandError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => CommandId::Noop,
            0x01 => CommandId::Hello,
            0x02 => CommandId::SetMinPulse,
            0x03 => CommandId::SetMaxPulse,
            0x04 => CommandId::SetThrottleMode,
            0x05 => CommandId::SetEscCount,
            0x06 => CommandId::Start,
            0x07 => CommandId::Arm,
            0x08 => CommandId::SetThrottle,
            0x09 => CommandId::Disarm,
            other => return Err(CommandError::UnknownId(other)),
        })
    }
}

/// Command decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Checksum byte did not match the body.
    Checksum,
    /// Body carried an identifier outside the command set.
    UnknownId(u8),
}

/// A decoded command with its 16-bit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub id: CommandId,
    pub value: u16,
}

impl Command {
    #[inline]
    #[must_use]
    pub const fn new(id: CommandId, value: u16) -> Self {
        Self { id, value }
    }

    /// Command without an argument.
    #[inline]
    #[must_use]
    pub const fn bare(id: CommandId) -> Self {
        Self { id, value: 0 }
    }

    /// Decode the three body bytes that follow the header.
    pub fn from_body(body: [u8; 3]) -> Result<Self, CommandError> {
        let id = CommandId::try_from(body[0])?;
        Ok(Self {
            id,
            value: u16::from_le_bytes([body[1], body[2]]),
        })
    }

    /// Encode as a complete frame, header and checksum included.
    #[must_use]
    pub fn encode(&self) -> [u8; COMMAND_FRAME_LEN] {
        let [lsb, msb] = self.value.to_le_bytes();
        let body = [self.id as u8, lsb, msb];
        [COMMAND_HEADER, body[0], body[1], body[2], xor_checksum(&body)]
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_encode_set_throttle() {
        let frame = Command::new(CommandId::SetThrottle, 50).encode();
        assert_eq!(frame, [0x00, 0x08, 0x32, 0x00, 0x3A]);
    }

    #[test]
    fn test_encode_little_endian_value() {
        let frame = Command::new(CommandId::SetMaxPulse, 2000).encode();
        // 2000 = 0x07D0
        assert_eq!(frame, [0x00, 0x03, 0xD0, 0x07, 0x03 ^ 0xD0 ^ 0x07]);
    }

    #[test]
    fn test_from_body() {
        let cmd = Command::from_body([0x05, 0x02, 0x00]).unwrap();
        assert_eq!(cmd, Command::new(CommandId::SetEscCount, 2));
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(
            Command::from_body([0x0A, 0x00, 0x00]),
            Err(CommandError::UnknownId(0x0A))
        );
        assert_eq!(CommandId::try_from(0xFF), Err(CommandError::UnknownId(0xFF)));
    }

    #[test]
    fn test_all_ids_convert() {
        for raw in 0x00..=0x09u8 {
            let id = CommandId::try_from(raw).unwrap();
            assert_eq!(id as u8, raw);
        }
    }
}
