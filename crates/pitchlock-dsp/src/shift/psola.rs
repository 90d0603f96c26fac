//! Time-domain pitch shifting by pitch-synchronous grain resynthesis.
//!
//! One Hann-windowed grain of two pitch periods is extracted per output
//! pitch cycle and overlap-added at the target cycle rate. Every grain is
//! anchored on the positive peak of its cycle, so all grains carry the same
//! phase and the overlap-add spacing alone sets the output period. The input
//! read position advances one sample per output sample regardless of ratio,
//! so the spectral envelope stays pinned to real time and formants do not
//! migrate with the shift. Shifting up spawns grains faster than they are
//! extracted (some cycles repeat); shifting down spawns slower (some cycles
//! are dropped).

use super::PitchShifter;
use crate::detector::VOICING_THRESHOLD;
use pitchlock_core::HistoryBuffer;
use std::f32::consts::TAU;

const GRAIN_SLOTS: usize = 32;

/// Floor for the OLA window-weight sum before falling back to dry.
const WEIGHT_FLOOR: f32 = 1e-6;

#[derive(Debug, Clone)]
struct Grain {
    /// Raw input snapshot; windowed during synthesis.
    samples: Vec<f32>,
    length: usize,
    /// Absolute output index of the window's first sample.
    start: u64,
    active: bool,
}

/// Grain-based shifter with latency of two maximum periods.
#[derive(Debug, Clone)]
pub struct PsolaShifter {
    min_period: f32,
    max_period: f32,
    latency: usize,
    history: HistoryBuffer,
    grains: Vec<Grain>,
    next_slot: usize,
    /// Grain-spawn accumulator in cycles; spawns on each wrap past 1.0.
    phase: f32,
    smoothed_period: f32,
    /// Samples consumed, equal to samples produced.
    position: u64,
}

impl PsolaShifter {
    /// Supported periods span 1 kHz down to 50 Hz at the given rate.
    pub fn new(sample_rate: f32, max_block_size: usize) -> Self {
        let min_period = sample_rate / 1000.0;
        let max_period = sample_rate / 50.0;
        let grain_capacity = (2.0 * max_period).ceil() as usize + 1;
        let history_len = (8.0 * max_period) as usize + max_block_size;

        Self {
            min_period,
            max_period,
            latency: (2.0 * max_period) as usize,
            history: HistoryBuffer::new(history_len),
            grains: (0..GRAIN_SLOTS)
                .map(|_| Grain {
                    samples: vec![0.0; grain_capacity],
                    length: 0,
                    start: 0,
                    active: false,
                })
                .collect(),
            next_slot: 0,
            phase: 1.0,
            smoothed_period: 0.0,
            position: 0,
        }
    }

    /// Drop grains and period tracking but keep the input history, so a
    /// voiced onset right after a gap still has context to extract from.
    fn clear_voiced_state(&mut self) {
        for grain in &mut self.grains {
            grain.active = false;
        }
        self.smoothed_period = 0.0;
        self.phase = 1.0;
    }

    /// Snapshot a two-period grain around the latency-delayed read position,
    /// centered on the largest signed sample within half a period each way.
    /// Any half-period search span contains exactly one positive cycle peak,
    /// so consecutive grains land on the same landmark and stay in phase;
    /// searching `|x|` instead would flip between the crest and the trough
    /// and hand the output back its input period. Skipped when the history
    /// does not yet reach back far enough; the next phase wrap retries.
    fn spawn_grain(&mut self, out_pos: u64) {
        let period = self.smoothed_period;
        let period_i = period.ceil() as i64;
        let length = ((2.0 * period) as usize).clamp(4, self.grains[0].samples.len());

        let out_i = out_pos as i64;
        let nominal = out_i + period_i - self.latency as i64;
        let half = (period * 0.5) as i64;
        let lo = (nominal - half).max(period_i);
        let hi = (nominal + half).min(out_i - period_i);
        if lo > hi {
            return;
        }

        let mut center = nominal.clamp(lo, hi);
        let mut best = f32::MIN;
        for idx in lo..=hi {
            let value = self.history.get(idx as u64);
            if value > best {
                best = value;
                center = idx;
            }
        }

        let first = center - (length / 2) as i64;
        if first < 0 {
            return;
        }

        let slot = &mut self.grains[self.next_slot];
        self.next_slot = (self.next_slot + 1) % GRAIN_SLOTS;
        for (j, sample) in slot.samples[..length].iter_mut().enumerate() {
            *sample = self.history.get((first + j as i64) as u64);
        }
        slot.length = length;
        slot.start = out_pos;
        slot.active = true;
    }

    /// Overlap-add every live grain at this output position, normalized by
    /// the local window-weight sum so uneven overlap does not ripple the
    /// amplitude. Falls back to the delayed dry sample where no grain covers.
    fn synthesize(&mut self, out_pos: u64, dry: f32) -> f32 {
        let mut wet = 0.0f32;
        let mut weight = 0.0f32;
        for grain in &mut self.grains {
            if !grain.active {
                continue;
            }
            let offset = (out_pos - grain.start) as usize;
            if offset >= grain.length {
                grain.active = false;
                continue;
            }
            let w = hann(offset, grain.length);
            wet += w * grain.samples[offset];
            weight += w;
        }

        if weight > WEIGHT_FLOOR {
            wet / weight
        } else {
            dry
        }
    }
}

impl PitchShifter for PsolaShifter {
    fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        pitch_ratio: f32,
        period: f32,
        confidence: f32,
    ) {
        let n = input.len().min(output.len());
        self.history.push(&input[..n]);

        if period <= 0.0 || confidence < VOICING_THRESHOLD {
            output[..n].copy_from_slice(&input[..n]);
            self.clear_voiced_state();
            self.position += n as u64;
            return;
        }

        let ratio = pitch_ratio.clamp(0.5, 2.0);
        let period = period.clamp(self.min_period, self.max_period);
        self.smoothed_period = if self.smoothed_period <= 0.0 {
            period
        } else {
            0.9 * self.smoothed_period + 0.1 * period
        };

        // One wrap per output cycle: the spawn rate is the target pitch
        let increment = ratio / self.smoothed_period;
        let latency = self.latency as u64;

        for out in output[..n].iter_mut() {
            let out_pos = self.position;
            self.phase += increment;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
                self.spawn_grain(out_pos);
            }

            let dry = if out_pos >= latency {
                self.history.get(out_pos - latency)
            } else {
                0.0
            };
            *out = self.synthesize(out_pos, dry);
            self.position += 1;
        }
    }

    fn latency_samples(&self) -> usize {
        self.latency
    }

    fn reset(&mut self) {
        self.clear_voiced_state();
        self.history.clear();
        self.position = 0;
    }
}

#[inline]
fn hann(index: usize, length: usize) -> f32 {
    0.5 - 0.5 * (TAU * index as f32 / length as f32).cos()
}
