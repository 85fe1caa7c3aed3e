//! XOR checksum used by every frame on the monitor link.

/// XOR of all bytes.
#[inline]
#[must_use]
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(xor_checksum(&[]), 0);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(xor_checksum(&[0x08, 0x32, 0x00]), 0x3A);
        assert_eq!(xor_checksum(&[0xFF, 0xF0]), 0x0F);
        // Header byte is zero, so it never changes the command checksum
        assert_eq!(xor_checksum(&[0x00, 0x05, 0x02, 0x00]), xor_checksum(&[0x05, 0x02, 0x00]));
    }
}
