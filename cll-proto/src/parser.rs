//! Byte-at-a-time command frame parser.
//!
//! Runs in the UART receive path. While idle, every byte other than
//! [`COMMAND_HEADER`] is discarded, so the parser resynchronizes on its own
//! after line noise or a corrupted frame.

use crate::checksum::xor_checksum;
use crate::command::{Command, CommandError, COMMAND_HEADER};

const BODY_LEN: usize = 3;

/// Command frame parser.
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    body: [u8; BODY_LEN],
    /// Body bytes received so far. `None` while waiting for a header.
    filled: Option<usize>,
}

impl CommandParser {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            body: [0; BODY_LEN],
            filled: None,
        }
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(command))` when a frame completes, `Ok(None)` while
    /// more bytes are needed. On error the parser is already back to idle.
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<Command>, CommandError> {
        match self.filled {
            None => {
                if byte == COMMAND_HEADER {
                    self.filled = Some(0);
                }
                Ok(None)
            }
            Some(n) if n < BODY_LEN => {
                self.body[n] = byte;
                self.filled = Some(n + 1);
                Ok(None)
            }
            Some(_) => {
                self.filled = None;
                if xor_checksum(&self.body) != byte {
                    return Err(CommandError::Checksum);
                }
                Command::from_body(self.body).map(Some)
            }
        }
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.filled = None;
    }

    /// True while a frame is partially received.
    #[must_use]
    pub const fn in_frame(&self) -> bool {
        self.filled.is_some()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::command::CommandId;
    use std::vec::Vec;

    fn feed(parser: &mut CommandParser, bytes: &[u8]) -> Vec<Result<Command, CommandError>> {
        bytes
            .iter()
            .filter_map(|&b| parser.push_byte(b).transpose())
            .collect()
    }

    #[test]
    fn test_parses_encoded_frame() {
        let mut parser = CommandParser::new();
        let frame = Command::new(CommandId::SetMinPulse, 1100).encode();
        let out = feed(&mut parser, &frame);
        assert_eq!(out, [Ok(Command::new(CommandId::SetMinPulse, 1100))]);
        assert!(!parser.in_frame());
    }

    #[test]
    fn test_skips_noise_before_header() {
        let mut parser = CommandParser::new();
        let mut bytes = std::vec![0x55, 0xAA, 0x13];
        bytes.extend_from_slice(&Command::bare(CommandId::Arm).encode());
        let out = feed(&mut parser, &bytes);
        assert_eq!(out, [Ok(Command::bare(CommandId::Arm))]);
    }

    #[test]
    fn test_bad_checksum_resets() {
        let mut parser = CommandParser::new();
        let mut frame = Command::new(CommandId::SetThrottle, 40).encode();
        frame[4] ^= 0x01;
        let out = feed(&mut parser, &frame);
        assert_eq!(out, [Err(CommandError::Checksum)]);
        assert!(!parser.in_frame());

        // Next good frame still parses
        let out = feed(&mut parser, &Command::new(CommandId::SetThrottle, 40).encode());
        assert_eq!(out, [Ok(Command::new(CommandId::SetThrottle, 40))]);
    }

    #[test]
    fn test_unknown_id_with_valid_checksum() {
        let mut parser = CommandParser::new();
        let out = feed(&mut parser, &[0x00, 0x42, 0x00, 0x00, 0x42]);
        assert_eq!(out, [Err(CommandError::UnknownId(0x42))]);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut parser = CommandParser::new();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Command::bare(CommandId::Hello).encode());
        bytes.extend_from_slice(&Command::new(CommandId::SetEscCount, 2).encode());
        bytes.extend_from_slice(&Command::bare(CommandId::Start).encode());

        let out = feed(&mut parser, &bytes);
        assert_eq!(
            out,
            [
                Ok(Command::bare(CommandId::Hello)),
                Ok(Command::new(CommandId::SetEscCount, 2)),
                Ok(Command::bare(CommandId::Start)),
            ]
        );
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut parser = CommandParser::new();
        feed(&mut parser, &[0x00, 0x08]);
        assert!(parser.in_frame());
        parser.reset();
        assert!(!parser.in_frame());
    }
}
