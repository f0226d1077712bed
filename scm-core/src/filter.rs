//! Matched filter (integrate-and-dump) and the bit slicer/packer.
//!
//! The matched filter collapses each Manchester symbol pair to one soft
//! decision; the slicer thresholds those decisions to bits and validates
//! the fixed preamble prefix before packing the payload.

use crate::config::{FRAME_SYMBOLS, PREAMBLE_BITS};
use crate::math::round_half_up;

/// Soft bit decisions for one full SCM frame.
pub type SoftFrame = [f32; FRAME_SYMBOLS];

/// Sliced bit decisions for one full SCM frame (each element 0 or 1).
pub type BitFrame = [u8; FRAME_SYMBOLS];

/// Number of payload bits after the 16-bit preamble/ID prefix (`80`).
pub const PAYLOAD_BITS: usize = FRAME_SYMBOLS - 16;

/// Number of payload bytes once packed (`10`).
pub const PAYLOAD_BYTES: usize = PAYLOAD_BITS / 8;

/// Integrate-and-dump matched filter.
///
/// `magnitude` must have at least enough samples past `align` to cover a
/// full packet; the caller (ReceiverLoop) guarantees this by only
/// invoking the filter when `align <= BLOCK_LEN`.
///
/// For each symbol `k`, sums the first half-symbol and subtracts the sum
/// of the second half-symbol: `+` corresponds to Manchester `1 -> (+,-)`,
/// `-` to `0 -> (-,+)`.
pub fn matched_filter(magnitude: &[f32], align: usize, symbol_length: f64) -> SoftFrame {
    let mut out = [0.0f32; FRAME_SYMBOLS];
    for (k, slot) in out.iter_mut().enumerate() {
        let lo = round_half_up(k as f64 * 2.0 * symbol_length).max(0) as usize;
        let hi = round_half_up(k as f64 * 2.0 * symbol_length + symbol_length).max(0) as usize;
        let s = hi - lo;
        let first: f32 = magnitude[align + lo..align + hi].iter().sum();
        let second: f32 = magnitude[align + lo + s..align + hi + s].iter().sum();
        *slot = first - second;
    }
    out
}

/// Threshold soft decisions at zero to produce bits (sign convention
/// matching `matched_filter`: positive -> `1`, non-positive -> `0`).
pub fn slice(soft: &SoftFrame) -> BitFrame {
    let mut bits = [0u8; FRAME_SYMBOLS];
    for (b, &s) in bits.iter_mut().zip(soft.iter()) {
        *b = if s > 0.0 { 1 } else { 0 };
    }
    bits
}

/// Does the first 21 bits of a sliced frame match the fixed preamble?
pub fn verify_preamble(bits: &BitFrame) -> bool {
    bits[..PREAMBLE_BITS.len()] == PREAMBLE_BITS
}

/// Pack bits `16..96` (the 80-bit SCM payload) into 10 bytes, MSB-first.
pub fn pack_payload(bits: &BitFrame) -> [u8; PAYLOAD_BYTES] {
    let mut bytes = [0u8; PAYLOAD_BYTES];
    for (byte, chunk) in bytes.iter_mut().zip(bits[16..].chunks(8)) {
        let mut b = 0u8;
        for &bit in chunk {
            b = (b << 1) | bit;
        }
        *byte = b;
    }
    bytes
}

/// Inverse of `pack_payload`: unpack 10 bytes back into 80 bits, MSB-first
/// per byte. Used to reconstruct the full 96-bit frame after BCH
/// correction has mutated the packed payload in place.
pub fn unpack_payload(bytes: &[u8; PAYLOAD_BYTES]) -> [u8; PAYLOAD_BITS] {
    let mut bits = [0u8; PAYLOAD_BITS];
    for (i, &byte) in bytes.iter().enumerate() {
        for b in 0..8 {
            bits[i * 8 + b] = (byte >> (7 - b)) & 1;
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ideal_soft_for_bits(bits: &[u8], symbol_length: f64) -> SoftFrame {
        // Build a magnitude trace that is an ideal Manchester rendering of
        // `bits` and run it back through the matched filter.
        let total_samples =
            round_half_up(bits.len() as f64 * 2.0 * symbol_length) as usize + 16;
        let mut mag = vec![0.5f32; total_samples];
        for (k, &bit) in bits.iter().enumerate() {
            let (first, second) = if bit == 1 { (1.0, 0.0) } else { (0.0, 1.0) };
            let lo = round_half_up(k as f64 * 2.0 * symbol_length) as usize;
            let mid = round_half_up(k as f64 * 2.0 * symbol_length + symbol_length) as usize;
            let hi = round_half_up((k + 1) as f64 * 2.0 * symbol_length) as usize;
            for s in &mut mag[lo..mid] {
                *s = first;
            }
            for s in &mut mag[mid..hi] {
                *s = second;
            }
        }
        matched_filter(&mag, 0, symbol_length)
    }

    #[test]
    fn test_matched_filter_sign_convention() {
        // Every soft output has the sign of the transmitted bit.
        let bits = [1u8, 0, 1, 1, 0, 0, 1, 0];
        let mut full = [0u8; FRAME_SYMBOLS];
        full[..bits.len()].copy_from_slice(&bits);
        let soft = ideal_soft_for_bits(&full, 16.0);
        for (k, &bit) in full.iter().enumerate() {
            if bit == 1 {
                assert!(soft[k] > 0.0, "bit {k} expected positive soft value");
            } else {
                assert!(soft[k] < 0.0, "bit {k} expected negative soft value");
            }
        }
    }

    #[test]
    fn test_slice_threshold() {
        let mut soft = [0.0f32; FRAME_SYMBOLS];
        soft[0] = 1.0;
        soft[1] = -1.0;
        soft[2] = 0.0;
        let bits = slice(&soft);
        assert_eq!(bits[0], 1);
        assert_eq!(bits[1], 0);
        assert_eq!(bits[2], 0);
    }

    #[test]
    fn test_verify_preamble_match() {
        let mut bits = [0u8; FRAME_SYMBOLS];
        bits[..21].copy_from_slice(&PREAMBLE_BITS);
        assert!(verify_preamble(&bits));
    }

    #[test]
    fn test_verify_preamble_mismatch() {
        let bits = [0u8; FRAME_SYMBOLS];
        assert!(!verify_preamble(&bits));
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let mut bits = [0u8; FRAME_SYMBOLS];
        for (i, b) in bits.iter_mut().enumerate() {
            *b = (i % 2) as u8;
        }
        let packed = pack_payload(&bits);
        let unpacked = unpack_payload(&packed);
        assert_eq!(&bits[16..], &unpacked[..]);
    }

    #[test]
    fn test_pack_payload_msb_first() {
        let mut bits = [0u8; FRAME_SYMBOLS];
        // First payload byte = 0b10110000
        bits[16] = 1;
        bits[17] = 0;
        bits[18] = 1;
        bits[19] = 1;
        bits[20] = 0;
        bits[21] = 0;
        bits[22] = 0;
        bits[23] = 0;
        let packed = pack_payload(&bits);
        assert_eq!(packed[0], 0b1011_0000);
    }
}
