//! Anti-aliased decimation for the coarse pitch search.
//!
//! The coarse search only needs to localize the pitch period to within a few
//! samples, so it runs on an 8x decimated copy of the analysis frame. A
//! windowed-sinc lowpass keeps energy above the decimated Nyquist from
//! aliasing into the search band.

use std::f32::consts::PI;

/// Decimation factor between the full-rate frame and the coarse search.
pub(crate) const FACTOR: usize = 8;

const TAPS: usize = 33;

/// 33-tap windowed-sinc lowpass combined with 8x downsampling.
#[derive(Debug, Clone)]
pub(crate) struct Decimator {
    coefficients: [f32; TAPS],
}

impl Decimator {
    pub(crate) fn new() -> Self {
        let cutoff = 1.0 / (2.0 * FACTOR as f32);
        let centre = (TAPS / 2) as i32;
        let mut coefficients = [0.0f32; TAPS];

        for (i, coefficient) in coefficients.iter_mut().enumerate() {
            let x = i as i32 - centre;
            let sinc = if x == 0 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * x as f32).sin() / (PI * x as f32)
            };
            let window = 0.5 - 0.5 * (2.0 * PI * i as f32 / (TAPS - 1) as f32).cos();
            *coefficient = sinc * window;
        }

        // Normalize for unity DC gain
        let sum: f32 = coefficients.iter().sum();
        for coefficient in coefficients.iter_mut() {
            *coefficient /= sum;
        }

        Self { coefficients }
    }

    /// Filter and downsample `input` into `output`.
    ///
    /// Writes `input.len() / FACTOR` samples; edge taps that fall outside the
    /// frame are treated as silence.
    pub(crate) fn process(&self, input: &[f32], output: &mut [f32]) {
        let out_len = input.len() / FACTOR;
        let centre = (TAPS / 2) as i64;

        for (k, slot) in output.iter_mut().take(out_len).enumerate() {
            let base = (k * FACTOR) as i64;
            let mut acc = 0.0f32;
            for (t, &coefficient) in self.coefficients.iter().enumerate() {
                let idx = base + t as i64 - centre;
                if idx >= 0 && (idx as usize) < input.len() {
                    acc += input[idx as usize] * coefficient;
                }
            }
            *slot = acc;
        }
    }
}
