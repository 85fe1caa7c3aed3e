//! Device-to-host frames.
//!
//! Telemetry frame (26 bytes):
//!
//! ```text
//! +------+-----------------+----------------------------+----------+-----+
//! | 0xFF | 0xF0 | P | ESC | 11 x tick count, big-endian | checksum | pad |
//! +------+-----------------+----------------------------+----------+-----+
//! ```
//!
//! `P` (bit 3) flags a present throttle signal and `ESC` (bits 0-2) is the
//! zero-based ESC index. The checksum is the XOR of the 24 preceding bytes.
//!
//! Response frame (2 bytes): `0x55`, then `0xAA | ack`.

use cll_core::{RawFrame, FRAME_LEN};

use crate::checksum::xor_checksum;

pub const REPORT_HEADER: u8 = 0xFF;
pub const REPORT_TAG: u8 = 0xF0;
pub const REPORT_TAG_MASK: u8 = 0xF0;
pub const THROTTLE_PRESENT_BIT: u8 = 0x08;
pub const ESC_ID_MASK: u8 = 0x07;

/// Length of a telemetry frame on the wire.
pub const TELEMETRY_FRAME_LEN: usize = 26;

/// Bytes covered by the telemetry checksum.
const CHECKSUM_SPAN: usize = 2 + FRAME_LEN * 2;

pub const RESPONSE_HEADER: u8 = 0x55;
pub const RESPONSE_TAG: u8 = 0xAA;
pub const RESPONSE_ACK: u8 = 0x01;

/// Length of a response frame on the wire.
pub const RESPONSE_FRAME_LEN: usize = 2;

/// Encode one ESC's raw frame.
#[must_use]
pub fn encode_telemetry(esc: u8, throttle_present: bool, frame: &RawFrame) -> [u8; TELEMETRY_FRAME_LEN] {
    let mut out = [0u8; TELEMETRY_FRAME_LEN];
    out[0] = REPORT_HEADER;
    out[1] = REPORT_TAG | (esc & ESC_ID_MASK);
    if throttle_present {
        out[1] |= THROTTLE_PRESENT_BIT;
    }

    for (chunk, ticks) in out[2..CHECKSUM_SPAN].chunks_exact_mut(2).zip(frame.ticks.iter()) {
        chunk.copy_from_slice(&ticks.to_be_bytes());
    }

    out[CHECKSUM_SPAN] = xor_checksum(&out[..CHECKSUM_SPAN]);
    out
}

/// Encode a command acknowledgement.
#[inline]
#[must_use]
pub const fn encode_response(ack: bool) -> [u8; RESPONSE_FRAME_LEN] {
    [RESPONSE_HEADER, RESPONSE_TAG | if ack { RESPONSE_ACK } else { 0 }]
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_response_frames() {
        assert_eq!(encode_response(true), [0x55, 0xAB]);
        assert_eq!(encode_response(false), [0x55, 0xAA]);
    }

    #[test]
    fn test_telemetry_layout() {
        let mut ticks = [0u16; FRAME_LEN];
        for (i, t) in ticks.iter_mut().enumerate() {
            *t = 0x0100 * (i as u16 + 1) + 0x10;
        }
        let out = encode_telemetry(1, true, &RawFrame::new(ticks));

        assert_eq!(out.len(), 26);
        assert_eq!(out[0], 0xFF);
        assert_eq!(out[1], 0xF9);
        assert_eq!(&out[2..4], &[0x01, 0x10]);
        assert_eq!(&out[22..24], &[0x0B, 0x10]);
        assert_eq!(out[24], xor_checksum(&out[..24]));
        assert_eq!(out[25], 0);
    }

    #[test]
    fn test_header_without_throttle() {
        let out = encode_telemetry(0, false, &RawFrame::EMPTY);
        assert_eq!(out[1], 0xF0);
        // 0xFF ^ 0xF0 over an all-zero body
        assert_eq!(out[24], 0x0F);
    }

    #[test]
    fn test_esc_id_is_masked() {
        let out = encode_telemetry(0x0C, false, &RawFrame::EMPTY);
        assert_eq!(out[1] & ESC_ID_MASK, 0x04);
        assert_eq!(out[1] & REPORT_TAG_MASK, REPORT_TAG);
        assert_eq!(out[1] & THROTTLE_PRESENT_BIT, 0);
    }
}
