//! Frame integrity trailer computation and verification.

use crate::bits::{self, Bit};
use crate::config::ErrorDetection;

/// Compute the integrity trailer for a (byte-aligned) payload.
///
/// Returns the 8-bit trailer-size field and the trailer itself. For
/// `simple_hash` the trailer is the count of one-bits in the payload,
/// rendered in binary and left-padded to a whole number of bytes. An empty
/// payload carries no trailer at all.
pub fn error_detection_data(
    payload: &[Bit],
    algorithm: ErrorDetection,
) -> (Vec<Bit>, Vec<Bit>) {
    match algorithm {
        ErrorDetection::SimpleHash => simple_hash(payload),
    }
}

/// Check a complete frame against its trailer. True means corrupt.
pub fn frame_has_errors(frame: &[Bit], algorithm: ErrorDetection) -> bool {
    match algorithm {
        ErrorDetection::SimpleHash => simple_hash_check(frame),
    }
}

fn simple_hash(payload: &[Bit]) -> (Vec<Bit>, Vec<Bit>) {
    if payload.is_empty() {
        return (bits::bits_from_int(0, 8), Vec::new());
    }
    let sum = bits::ones(payload);
    let width = significant_bits(sum).div_ceil(8) * 8;
    let trailer = bits::bits_from_int(sum, width);
    let size = bits::bits_from_int((width / 8) as u64, 8);
    (size, trailer)
}

fn simple_hash_check(frame: &[Bit]) -> bool {
    if frame.len() < 48 {
        return true;
    }
    let trailer_bits = bits::bits_to_int(&frame[40..48]) as usize * 8;
    if frame.len() < 48 + trailer_bits {
        return true;
    }
    let payload = &frame[48..frame.len() - trailer_bits];
    let trailer = &frame[frame.len() - trailer_bits..];
    bits::ones(payload) != bits::bits_to_int(trailer)
}

/// Number of binary digits in `value`, at least one.
fn significant_bits(value: u64) -> usize {
    (64 - value.leading_zeros()).max(1) as usize
}
