//! STFT phase-vocoder pitch shifting.
//!
//! Classic analysis/synthesis vocoder: Hann-windowed frames at 4x overlap,
//! per-bin instantaneous frequency recovered from the phase delta against
//! the expected hop advance, magnitudes relocated to `round(bin * ratio)`,
//! phases re-accumulated per synthesis bin, overlap-add back through a FIFO.
//! Needs no period estimate, at the price of a full frame of latency.

use super::PitchShifter;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::TAU;
use std::sync::Arc;

const FRAME_SIZE: usize = 2048;
const OVERSAMPLING: usize = 4;

/// Per-frame ratio clamp. Wider than the retune stage's [0.5, 2.0]; the
/// narrower clamp upstream is what callers actually hear.
const RATIO_MIN: f32 = 0.25;
const RATIO_MAX: f32 = 4.0;

/// One channel of phase-vocoder shifting.
pub struct VocoderShifter {
    frame_size: usize,
    hop_size: usize,
    spectrum_size: usize,
    window: Vec<f32>,
    in_fifo: Vec<f32>,
    out_fifo: Vec<f32>,
    in_index: usize,
    out_index: usize,
    analysis_mag: Vec<f32>,
    analysis_freq: Vec<f32>,
    synthesis_mag: Vec<f32>,
    synthesis_freq: Vec<f32>,
    last_phase: Vec<f32>,
    sum_phase: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    forward_fft: Arc<dyn Fft<f32>>,
    inverse_fft: Arc<dyn Fft<f32>>,
    /// Restores unity gain through forward FFT, inverse FFT, and 4x Hann
    /// overlap-add: 2 / (3 * frame).
    synthesis_gain: f32,
    ratio_accumulator: f32,
    ratio_samples: usize,
}

impl VocoderShifter {
    pub fn new(_sample_rate: f32, _max_block_size: usize) -> Self {
        let frame_size = FRAME_SIZE;
        let hop_size = frame_size / OVERSAMPLING;
        let spectrum_size = frame_size / 2;

        let mut planner = FftPlanner::new();
        let forward_fft = planner.plan_fft_forward(frame_size);
        let inverse_fft = planner.plan_fft_inverse(frame_size);
        let scratch_len = forward_fft
            .get_inplace_scratch_len()
            .max(inverse_fft.get_inplace_scratch_len());

        Self {
            frame_size,
            hop_size,
            spectrum_size,
            window: (0..frame_size)
                .map(|i| 0.5 - 0.5 * (TAU * i as f32 / frame_size as f32).cos())
                .collect(),
            in_fifo: vec![0.0; frame_size],
            out_fifo: vec![0.0; frame_size],
            in_index: 0,
            out_index: 0,
            analysis_mag: vec![0.0; spectrum_size + 1],
            analysis_freq: vec![0.0; spectrum_size + 1],
            synthesis_mag: vec![0.0; spectrum_size + 1],
            synthesis_freq: vec![0.0; spectrum_size + 1],
            last_phase: vec![0.0; spectrum_size + 1],
            sum_phase: vec![0.0; spectrum_size + 1],
            fft_buffer: vec![Complex::default(); frame_size],
            scratch: vec![Complex::default(); scratch_len],
            forward_fft,
            inverse_fft,
            synthesis_gain: 2.0 / (3.0 * frame_size as f32),
            ratio_accumulator: 0.0,
            ratio_samples: 0,
        }
    }

    fn process_frame(&mut self, ratio: f32) {
        let expected_advance = TAU * self.hop_size as f32 / self.frame_size as f32;

        for i in 0..self.frame_size {
            self.fft_buffer[i] = Complex::new(self.in_fifo[i] * self.window[i], 0.0);
        }
        self.forward_fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        for bin in 0..=self.spectrum_size {
            let value = self.fft_buffer[bin];
            let magnitude = value.norm();
            let phase = value.im.atan2(value.re);

            let delta = wrap_phase(phase - self.last_phase[bin] - bin as f32 * expected_advance);
            self.last_phase[bin] = phase;

            self.analysis_mag[bin] = magnitude;
            self.analysis_freq[bin] = bin as f32 + delta / expected_advance;
        }

        for bin in 0..=self.spectrum_size {
            self.synthesis_mag[bin] = 0.0;
            self.synthesis_freq[bin] = bin as f32;
        }
        for bin in 0..=self.spectrum_size {
            let target = (bin as f32 * ratio).round() as usize;
            if target > self.spectrum_size {
                continue;
            }
            self.synthesis_mag[target] += self.analysis_mag[bin];
            self.synthesis_freq[target] = self.analysis_freq[bin] * ratio;
        }

        for bin in 0..=self.spectrum_size {
            self.sum_phase[bin] =
                wrap_phase(self.sum_phase[bin] + expected_advance * self.synthesis_freq[bin]);
            let (sin, cos) = self.sum_phase[bin].sin_cos();
            let magnitude = self.synthesis_mag[bin];
            self.fft_buffer[bin] = Complex::new(magnitude * cos, magnitude * sin);
        }
        for bin in self.spectrum_size + 1..self.frame_size {
            self.fft_buffer[bin] = self.fft_buffer[self.frame_size - bin].conj();
        }

        self.inverse_fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        for i in 0..self.frame_size {
            self.out_fifo[i] += self.fft_buffer[i].re * self.window[i] * self.synthesis_gain;
        }
    }
}

impl PitchShifter for VocoderShifter {
    fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        pitch_ratio: f32,
        _period: f32,
        _confidence: f32,
    ) {
        let n = input.len().min(output.len());

        for i in 0..n {
            self.in_fifo[self.in_index] = input[i];
            output[i] = self.out_fifo[self.out_index];
            self.out_fifo[self.out_index] = 0.0;

            self.ratio_accumulator += pitch_ratio;
            self.ratio_samples += 1;
            self.in_index += 1;
            self.out_index += 1;

            if self.in_index >= self.frame_size {
                let average = if self.ratio_samples > 0 {
                    self.ratio_accumulator / self.ratio_samples as f32
                } else {
                    1.0
                };
                self.process_frame(average.clamp(RATIO_MIN, RATIO_MAX));

                self.ratio_accumulator = 0.0;
                self.ratio_samples = 0;

                let tail = self.frame_size - self.hop_size;
                self.in_fifo.copy_within(self.hop_size.., 0);
                self.out_fifo.copy_within(self.hop_size.., 0);
                self.in_fifo[tail..].fill(0.0);
                self.out_fifo[tail..].fill(0.0);
                self.in_index = tail;
                self.out_index = 0;
            }
        }
    }

    fn latency_samples(&self) -> usize {
        self.frame_size
    }

    fn reset(&mut self) {
        self.in_fifo.fill(0.0);
        self.out_fifo.fill(0.0);
        self.analysis_mag.fill(0.0);
        self.analysis_freq.fill(0.0);
        self.synthesis_mag.fill(0.0);
        self.synthesis_freq.fill(0.0);
        self.last_phase.fill(0.0);
        self.sum_phase.fill(0.0);
        self.in_index = 0;
        self.out_index = 0;
        self.ratio_accumulator = 0.0;
        self.ratio_samples = 0;
    }
}

#[inline]
fn wrap_phase(phase: f32) -> f32 {
    phase - TAU * (phase / TAU).round()
}
