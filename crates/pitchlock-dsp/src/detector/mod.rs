//! Monophonic pitch detection tuned for live vocals.
//!
//! Autocorrelation-family detector built around a normalized difference
//! score: for a candidate lag `L`, `V(L) = E(L) - 2H(L)` where `E` is the
//! energy of a two-period window ending at the newest sample and `H` is the
//! lag-L crosscorrelation between its two halves. `V` equals the summed
//! squared difference between the halves, so a perfectly periodic signal
//! scores 0 and uncorrelated noise scores near `E`.
//!
//! # Algorithm
//!
//! 1. Copy the newest analysis window (4x the longest trackable period) out
//!    of the input history and remove its DC mean. No window function is
//!    applied; tapering the frame would corrupt the periodicity statistic.
//! 2. Coarse search over an 8x decimated copy to localize the period cheaply,
//!    minimizing `V/E` against a lenient threshold.
//! 3. Of the passing lags, take the shortest one that is also a local
//!    minimum of `V/E`. Integer multiples of the true period score just as
//!    well as the period itself, so the global minimum lands on an arbitrary
//!    multiple; the local-dip requirement recovers the fundamental and also
//!    rejects the monotone slope at lags far below the true period.
//! 4. Fine search at the full rate, ±24 samples around the coarse estimate,
//!    against the strict tracking threshold.
//! 5. Parabolic interpolation over `V` at the winner and its neighbors for
//!    sub-sample period resolution.
//! 6. Confidence from the score at the rounded period, boosted while the
//!    period stays stable from block to block. The boost is what keeps a
//!    held note from flickering between voiced and unvoiced at the margin.

mod decimator;

use decimator::{Decimator, FACTOR};
use pitchlock_core::HistoryBuffer;
use serde::{Deserialize, Serialize};

/// Confidence above which input counts as voiced.
pub const VOICING_THRESHOLD: f32 = 0.2;

/// Hard limits for the trackable range; presets and manual ranges are
/// clamped into these. The 20 Hz floor also sizes the analysis buffers.
const MIN_FREQUENCY_FLOOR: f32 = 20.0;
const MAX_FREQUENCY_CEIL: f32 = 2000.0;

const MAX_COARSE_LAG: usize = 110;
const FINE_SEARCH_SPAN: usize = FACTOR * 3;
const COARSE_THRESHOLD: f64 = 0.5;
const DEFAULT_THRESHOLD: f32 = 0.15;
const ENERGY_FLOOR: f64 = 1e-9;

/// Frequency-range presets for common source material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    Soprano,
    AltoTenor,
    LowMale,
    Instrument,
    BassInstrument,
}

impl InputType {
    /// Trackable range in Hz as `(min, max)`.
    pub fn frequency_range(self) -> (f32, f32) {
        match self {
            InputType::Soprano => (200.0, 1200.0),
            InputType::AltoTenor => (100.0, 600.0),
            InputType::LowMale => (60.0, 300.0),
            InputType::Instrument => (80.0, 2000.0),
            InputType::BassInstrument => (30.0, 250.0),
        }
    }
}

/// One block's pitch measurement.
///
/// A default-constructed estimate is unvoiced: zero frequency, zero
/// confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchEstimate {
    /// Fundamental in Hz, 0.0 when no pitch was found.
    pub frequency: f32,
    /// Fundamental period in samples at the full rate.
    pub period: f32,
    /// 0.0 (noise) to 1.0 (strongly periodic and stable).
    pub confidence: f32,
}

impl PitchEstimate {
    #[inline]
    pub fn is_voiced(&self) -> bool {
        self.confidence > VOICING_THRESHOLD && self.frequency > 0.0
    }
}

/// Raw decision statistic for one candidate lag. Accumulated in f64; the
/// difference of two large near-equal sums is the whole signal here.
#[derive(Debug, Clone, Copy)]
struct PeriodScore {
    /// Summed squared difference between the window halves.
    v: f64,
    /// Energy of the full two-period window.
    e: f64,
}

impl PeriodScore {
    #[inline]
    fn ratio(self) -> f64 {
        self.v / self.e
    }
}

/// Block-rate monophonic pitch detector.
///
/// Feed it the same audio stream the shifter sees, one block at a time; it
/// analyzes the newest window once per [`process`](PitchDetector::process)
/// call. All buffers are sized in the constructor for the 20 Hz worst case,
/// so changing the frequency range afterwards never allocates.
#[derive(Debug, Clone)]
pub struct PitchDetector {
    sample_rate: f32,
    min_frequency: f32,
    max_frequency: f32,
    /// Score above which a fine candidate is rejected. See
    /// [`set_tracking`](PitchDetector::set_tracking).
    threshold: f32,
    /// Current analysis window length: 4x the longest trackable period.
    window_len: usize,
    history: HistoryBuffer,
    frame: Vec<f32>,
    decimated: Vec<f32>,
    coarse_scores: Vec<f64>,
    decimator: Decimator,
    last_period: f32,
    stable_frames: u32,
}

impl PitchDetector {
    /// Create a detector for `sample_rate` with the default 80-800 Hz range.
    pub fn new(sample_rate: f32) -> Self {
        let window_capacity = (4.0 * sample_rate / MIN_FREQUENCY_FLOOR) as usize;

        let mut detector = Self {
            sample_rate,
            min_frequency: 80.0,
            max_frequency: 800.0,
            threshold: DEFAULT_THRESHOLD,
            window_len: 0,
            history: HistoryBuffer::new(window_capacity * 2),
            frame: vec![0.0; window_capacity],
            decimated: vec![0.0; window_capacity / FACTOR + 1],
            coarse_scores: vec![f64::MAX; MAX_COARSE_LAG + 2],
            decimator: Decimator::new(),
            last_period: 0.0,
            stable_frames: 0,
        };
        detector.update_window_len();
        detector
    }

    /// Restrict detection to `min_hz..=max_hz`.
    ///
    /// Values are clamped to 20-2000 Hz and swapped if inverted. Never
    /// allocates; the analysis window just shrinks or grows within the
    /// buffers sized at construction.
    pub fn set_frequency_range(&mut self, min_hz: f32, max_hz: f32) {
        let mut min = min_hz.clamp(MIN_FREQUENCY_FLOOR, MAX_FREQUENCY_CEIL);
        let mut max = max_hz.clamp(MIN_FREQUENCY_FLOOR, MAX_FREQUENCY_CEIL);
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        self.min_frequency = min;
        self.max_frequency = max;
        self.update_window_len();
    }

    /// Apply a preset range for the given source material.
    pub fn set_input_type(&mut self, input_type: InputType) {
        let (min, max) = input_type.frequency_range();
        self.set_frequency_range(min, max);
    }

    /// Tracking leniency, 0.0 (strict) to 1.0 (loose).
    ///
    /// Maps linearly onto the rejection threshold 0.08..0.35. Loose tracking
    /// follows breathy or noisy sources further before giving up, at the
    /// cost of occasional spurious estimates.
    pub fn set_tracking(&mut self, tracking: f32) {
        self.threshold = 0.08 + tracking.clamp(0.0, 1.0) * (0.35 - 0.08);
    }

    pub fn min_frequency(&self) -> f32 {
        self.min_frequency
    }

    pub fn max_frequency(&self) -> f32 {
        self.max_frequency
    }

    /// Length of the analysis window in samples at the current range.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Forget all input history and pitch lock state.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_period = 0.0;
        self.stable_frames = 0;
    }

    /// Append a block and measure the pitch of the newest analysis window.
    pub fn process(&mut self, block: &[f32]) -> PitchEstimate {
        self.history.push(block);
        self.analyze()
    }

    fn update_window_len(&mut self) {
        let len = (4.0 * self.sample_rate / self.min_frequency) as usize;
        self.window_len = len.min(self.frame.len());
    }

    fn analyze(&mut self) -> PitchEstimate {
        let window_len = self.window_len;
        self.history.latest(&mut self.frame[..window_len]);

        let mean = self.frame[..window_len].iter().sum::<f32>() / window_len as f32;
        for sample in &mut self.frame[..window_len] {
            *sample -= mean;
        }

        let decimated_len = window_len / FACTOR;
        self.decimator
            .process(&self.frame[..window_len], &mut self.decimated[..decimated_len]);

        let coarse_lag = match self.coarse_search(decimated_len) {
            Some(lag) => lag,
            None => return PitchEstimate::default(),
        };

        let frame = &self.frame[..window_len];
        let period = match Self::fine_search(frame, coarse_lag * FACTOR, self.threshold) {
            Some(period) => period,
            None => return PitchEstimate::default(),
        };

        let frequency = self.sample_rate / period;
        if frequency < self.min_frequency || frequency > self.max_frequency {
            return PitchEstimate::default();
        }

        // Confidence from the score at the rounded period
        let score = match Self::period_score(frame, period.round() as usize) {
            Some(score) => score,
            None => return PitchEstimate::default(),
        };
        let mut confidence = (1.0 - score.ratio() as f32 / self.threshold).clamp(0.0, 1.0);

        // Stability boost: consecutive voiced blocks within 5% of the same
        // period make the lock progressively harder to shake
        if self.last_period > 0.0 {
            let period_ratio = period / self.last_period;
            if period_ratio > 0.95 && period_ratio < 1.05 {
                self.stable_frames += 1;
                confidence = (confidence + 0.1 * self.stable_frames as f32 / 10.0).min(1.0);
            } else {
                self.stable_frames = 0;
            }
        }
        self.last_period = period;

        PitchEstimate {
            frequency,
            period,
            confidence,
        }
    }

    /// Locate the period to decimated-sample resolution.
    fn coarse_search(&mut self, decimated_len: usize) -> Option<usize> {
        let ds_rate = self.sample_rate / FACTOR as f32;
        let min_lag = ((ds_rate / self.max_frequency) as usize).max(2);
        let max_lag = ((ds_rate / self.min_frequency) as usize).min(MAX_COARSE_LAG);

        if max_lag <= min_lag || max_lag >= decimated_len / 2 {
            return None;
        }

        // Score one lag past each end of the range too, so the local-minimum
        // test below has a real neighbor at the boundaries
        let eval_lo = min_lag.saturating_sub(1).max(2);
        let eval_hi = max_lag + 1;
        self.coarse_scores[..=eval_hi].fill(f64::MAX);
        let mut best_lag = 0;
        let mut best_ratio = f64::MAX;
        for lag in eval_lo..=eval_hi {
            if let Some(score) = Self::period_score(&self.decimated[..decimated_len], lag) {
                let ratio = score.ratio();
                self.coarse_scores[lag] = ratio;
                if (min_lag..=max_lag).contains(&lag) && ratio < best_ratio {
                    best_ratio = ratio;
                    best_lag = lag;
                }
            }
        }

        if best_lag == 0 || best_ratio > COARSE_THRESHOLD {
            return None;
        }

        // Every integer multiple of the true period scores as well as the
        // period itself, so the global minimum lands on an arbitrary multiple.
        // The fundamental is the shortest lag that both passes the threshold
        // and sits in a local dip; lags below the true period fail the dip
        // test because the score rises monotonically there
        for lag in min_lag..=max_lag {
            let ratio = self.coarse_scores[lag];
            if ratio < COARSE_THRESHOLD
                && ratio <= self.coarse_scores[lag - 1]
                && ratio <= self.coarse_scores[lag + 1]
            {
                return Some(lag);
            }
        }

        Some(best_lag)
    }

    /// Full-rate search around the coarse estimate, refined to a fractional
    /// period by parabolic interpolation over the raw difference statistic.
    fn fine_search(frame: &[f32], centre: usize, threshold: f32) -> Option<f32> {
        let lowest = centre.saturating_sub(FINE_SEARCH_SPAN).max(2);
        let highest = (centre + FINE_SEARCH_SPAN).min(frame.len() / 2 - 1);
        if lowest > highest {
            return None;
        }

        let mut best_lag = 0;
        let mut best = PeriodScore { v: 0.0, e: 0.0 };
        let mut best_ratio = f64::MAX;
        for lag in lowest..=highest {
            if let Some(score) = Self::period_score(frame, lag) {
                let ratio = score.ratio();
                if ratio < best_ratio {
                    best_ratio = ratio;
                    best_lag = lag;
                    best = score;
                }
            }
        }

        if best_lag == 0 || best_ratio > threshold as f64 {
            return None;
        }

        let mut period = best_lag as f32;
        if best_lag > lowest && best_lag < highest {
            let before = Self::period_score(frame, best_lag - 1);
            let after = Self::period_score(frame, best_lag + 1);
            if let (Some(s1), Some(s3)) = (before, after) {
                let denom = s1.v - 2.0 * best.v + s3.v;
                if denom.abs() > 1e-9 {
                    period += (0.5 * (s1.v - s3.v) / denom) as f32;
                }
            }
        }
        Some(period)
    }

    /// Difference statistic for one candidate lag, evaluated over a
    /// two-period window ending at the newest sample so the detector weighs
    /// what is being sung now, not half a window ago.
    fn period_score(data: &[f32], lag: usize) -> Option<PeriodScore> {
        if lag == 0 || 2 * lag >= data.len() {
            return None;
        }

        let start = data.len() - 2 * lag;
        let mut energy = 0.0f64;
        for &sample in &data[start..] {
            energy += f64::from(sample) * f64::from(sample);
        }

        let mut correlation = 0.0f64;
        for i in (data.len() - lag)..data.len() {
            correlation += f64::from(data[i]) * f64::from(data[i - lag]);
        }

        if energy < ENERGY_FLOOR {
            return None;
        }
        Some(PeriodScore {
            v: energy - 2.0 * correlation,
            e: energy,
        })
    }
}
