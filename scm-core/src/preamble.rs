//! Preamble localization via circular cross-correlation through a
//! half-complex DFT.
//!
//! The detector owns its `realfft` forward/inverse plans and scratch
//! buffers for its whole lifetime; dropping the detector releases them
//! (Rust's RAII covers the "scoped acquisition released on teardown"
//! design note — no explicit shutdown call is required).

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

use crate::config::{PREAMBLE_BITS, PREAMBLE_FFT_LEN, SYMBOL_LENGTH};
use crate::math::round_half_up;

/// Render the bipolar Manchester preamble reference waveform into a vector
/// of length `N_pre`, zero elsewhere.
///
/// `1 -> (+1, -1)`, `0 -> (-1, +1)`, each half-symbol stretched to
/// `SYMBOL_LENGTH` samples (rounded per half-symbol boundary).
fn build_reference(n_pre: usize, symbol_length: f64) -> Vec<f32> {
    let mut reference = vec![0.0f32; n_pre];
    for (bit_idx, &bit) in PREAMBLE_BITS.iter().enumerate() {
        let (first, second) = if bit == 1 { (1.0, -1.0) } else { (-1.0, 1.0) };
        for (half, sign) in [(0usize, first), (1usize, second)] {
            let m = bit_idx * 2 + half;
            let lo = round_half_up(m as f64 * symbol_length).max(0) as usize;
            let hi = round_half_up((m + 1) as f64 * symbol_length).max(0) as usize;
            let hi = hi.min(n_pre);
            if lo >= n_pre {
                continue;
            }
            for sample in reference.iter_mut().take(hi).skip(lo) {
                *sample = sign;
            }
        }
    }
    reference
}

/// Locates the start of the preamble within a magnitude buffer by
/// circular cross-correlation computed through a half-complex DFT.
pub struct PreambleDetector {
    n_pre: usize,
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    /// Conjugate of the forward DFT of the reference waveform. Immutable
    /// after construction.
    template: Vec<Complex<f32>>,
    real_scratch: Vec<f32>,
    complex_scratch: Vec<Complex<f32>>,
    r2c_scratch: Vec<Complex<f32>>,
    c2r_scratch: Vec<Complex<f32>>,
}

impl PreambleDetector {
    pub fn new() -> Self {
        Self::with_params(PREAMBLE_FFT_LEN, SYMBOL_LENGTH)
    }

    /// Build a detector for an arbitrary DFT size / symbol length — used
    /// by tests that want a smaller transform than the production
    /// `N_pre = 20480`.
    pub fn with_params(n_pre: usize, symbol_length: f64) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(n_pre);
        let c2r = planner.plan_fft_inverse(n_pre);

        let mut reference = build_reference(n_pre, symbol_length);
        let mut template = r2c.make_output_vec();
        let mut fwd_scratch = r2c.make_scratch_vec();
        r2c.process_with_scratch(&mut reference, &mut template, &mut fwd_scratch)
            .expect("forward DFT of preamble reference");
        for bin in template.iter_mut() {
            *bin = bin.conj();
        }

        let real_scratch = r2c.make_input_vec();
        let complex_scratch = r2c.make_output_vec();
        let r2c_scratch = r2c.make_scratch_vec();
        let c2r_scratch = c2r.make_scratch_vec();

        PreambleDetector {
            n_pre,
            r2c,
            c2r,
            template,
            real_scratch,
            complex_scratch,
            r2c_scratch,
            c2r_scratch,
        }
    }

    /// Size of the real scratch buffer (`N_pre`); the detector only
    /// consults the first `N_pre` samples of whatever buffer it is given.
    pub fn window_len(&self) -> usize {
        self.n_pre
    }

    /// Return the index in `[0, N_pre)` most likely to be the start of
    /// the preamble within `magnitude`.
    pub fn detect(&mut self, magnitude: &[f32]) -> usize {
        let n = self.n_pre.min(magnitude.len());
        self.real_scratch[..n].copy_from_slice(&magnitude[..n]);
        for sample in self.real_scratch[n..].iter_mut() {
            *sample = 0.0;
        }

        self.r2c
            .process_with_scratch(
                &mut self.real_scratch,
                &mut self.complex_scratch,
                &mut self.r2c_scratch,
            )
            .expect("forward DFT of magnitude window");

        for (bin, tmpl) in self.complex_scratch.iter_mut().zip(self.template.iter()) {
            *bin *= tmpl;
        }

        self.c2r
            .process_with_scratch(
                &mut self.complex_scratch,
                &mut self.real_scratch,
                &mut self.c2r_scratch,
            )
            .expect("inverse DFT of correlation");

        let mut best_idx = 0usize;
        let mut best_val = f32::NEG_INFINITY;
        for (idx, &val) in self.real_scratch.iter().enumerate() {
            if val > best_val {
                best_val = val;
                best_idx = idx;
            }
        }
        best_idx
    }
}

impl Default for PreambleDetector {
    fn default() -> Self {
        Self::new()
    }
}
