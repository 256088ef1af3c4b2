//! AS608 frame checksum
//!
//! The checksum covers the type byte, both length bytes and every payload
//! byte. It is a plain unsigned sum truncated to 16 bits: carries beyond
//! bit 15 are dropped, never folded back in.

use tracing::trace;

/// Calculate the checksum of a frame
///
/// `length` is the wire length field (payload length + 2).
///
/// # Examples
///
/// ```
/// use as608_core::checksum;
///
/// // GenImg command: type 0x01, length 3, payload [0x01]
/// assert_eq!(checksum::calculate(0x01, 3, &[0x01]), 0x0005);
/// ```
pub fn calculate(frame_type: u8, length: u16, payload: &[u8]) -> u16 {
    let [len_hi, len_lo] = length.to_be_bytes();

    let checksum = payload
        .iter()
        .fold(
            u16::from(frame_type)
                .wrapping_add(u16::from(len_hi))
                .wrapping_add(u16::from(len_lo)),
            |sum, &b| sum.wrapping_add(u16::from(b)),
        );

    trace!(
        frame_type = frame_type,
        length = length,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(frame_type: u8, length: u16, payload: &[u8], expected: u16) -> bool {
    calculate(frame_type, length, payload) == expected
}
