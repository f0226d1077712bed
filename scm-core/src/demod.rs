//! AM magnitude demodulation — convert raw interleaved IQ bytes to samples.
//!
//! Each unsigned byte is recentered around 127.5 and normalized to roughly
//! unit magnitude, then the I/Q pair is collapsed to its Euclidean norm.

use std::sync::LazyLock;

use crate::config::BLOCK_LEN;

/// Precomputed `hypot((127.5-i)/127, (127.5-q)/127)` for all 256×256 IQ
/// byte combinations, indexed `MAG_LUT[i * 256 + q]`.
static MAG_LUT: LazyLock<Vec<f32>> = LazyLock::new(|| {
    let mut lut = vec![0.0f32; 256 * 256];
    for i in 0..256u32 {
        let iv = (127.5 - i as f64) / 127.0;
        for q in 0..256u32 {
            let qv = (127.5 - q as f64) / 127.0;
            lut[(i * 256 + q) as usize] = iv.hypot(qv) as f32;
        }
    }
    lut
});

/// Convert `2B` interleaved I/Q bytes into `B` AM magnitude samples.
///
/// Input: flat slice `[I0, Q0, I1, Q1, ...]`. Output one `f32` per pair.
pub fn demodulate(raw: &[u8]) -> Vec<f32> {
    let n = raw.len() / 2;
    let lut = &*MAG_LUT;
    let mut mag = Vec::with_capacity(n);
    for i in 0..n {
        let idx = raw[i * 2] as usize * 256 + raw[i * 2 + 1] as usize;
        mag.push(lut[idx]);
    }
    mag
}

/// Demodulate directly into an existing buffer, overwriting its contents.
///
/// Used by the receiver loop to fill the second half of the magnitude
/// ring without a fresh allocation every block.
pub fn demodulate_into(raw: &[u8], out: &mut [f32]) {
    debug_assert_eq!(raw.len(), out.len() * 2);
    let lut = &*MAG_LUT;
    for (i, o) in out.iter_mut().enumerate() {
        let idx = raw[i * 2] as usize * 256 + raw[i * 2 + 1] as usize;
        *o = lut[idx];
    }
}

/// Expected raw byte count for one block (`2 * BLOCK_LEN`).
pub const RAW_BLOCK_BYTES: usize = BLOCK_LEN * 2;
