//! Linear per-sample smoothing for correction ratios and gains.
//!
//! Pitch correction glides between ratios rather than jumping; a jump reads as
//! a click or an unnatural "snap" onto the note. [`SmoothedValue`] ramps
//! linearly from the current value to a target over a configurable time.
//!
//! # Example
//!
//! ```
//! use pitchlock_core::SmoothedValue;
//!
//! // Glide the correction ratio over 20ms at 48kHz
//! let mut ratio = SmoothedValue::new(1.0, 0.020, 48000.0);
//!
//! ratio.set_target(1.059); // one semitone up
//!
//! // In the audio callback, either per-sample...
//! let r = ratio.next_sample();
//! // ...or advance a whole block at once
//! ratio.skip(256);
//! ```

/// Linearly smoothed value with a per-sample step.
///
/// Call [`next_sample()`](SmoothedValue::next_sample) once per sample, or
/// [`skip()`](SmoothedValue::skip) to advance a block in one call. Both snap
/// exactly onto the target when the ramp ends, so repeated ramps do not
/// accumulate floating point drift.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    step: f32,
    samples_remaining: u32,
    smooth_samples: u32,
}

impl SmoothedValue {
    pub fn new(initial: f32, smooth_time_secs: f32, sample_rate: f32) -> Self {
        let smooth_samples = (smooth_time_secs * sample_rate).max(1.0) as u32;

        Self {
            current: initial,
            target: initial,
            step: 0.0,
            samples_remaining: 0,
            smooth_samples,
        }
    }

    /// Start a ramp from the current value toward `target`.
    ///
    /// A target within `f32::EPSILON` of the existing one is ignored, so a
    /// per-block caller can re-assert an unchanged target for free.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        if (target - self.target).abs() < f32::EPSILON {
            return;
        }

        self.target = target;
        self.samples_remaining = self.smooth_samples;

        if self.samples_remaining > 0 {
            self.step = (self.target - self.current) / self.samples_remaining as f32;
        }
    }

    /// Jump to `value` with no ramp.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.samples_remaining = 0;
    }

    /// Call once per sample in the audio callback.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.step;
            self.samples_remaining -= 1;

            // Snap to target when done to avoid floating point drift
            if self.samples_remaining == 0 {
                self.current = self.target;
            }
        }

        self.current
    }

    /// Advance the ramp by `num_samples` in one step.
    ///
    /// Equivalent to calling [`next_sample()`](SmoothedValue::next_sample)
    /// `num_samples` times but O(1). Used by block-rate callers that only
    /// need the value once per block.
    #[inline]
    pub fn skip(&mut self, num_samples: u32) {
        if self.samples_remaining == 0 {
            return;
        }

        let n = num_samples.min(self.samples_remaining);
        self.current += self.step * n as f32;
        self.samples_remaining -= n;

        if self.samples_remaining == 0 {
            self.current = self.target;
        }
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.samples_remaining > 0
    }

    #[inline]
    pub fn samples_remaining(&self) -> u32 {
        self.samples_remaining
    }

    /// Takes effect on the next `set_target()` call.
    pub fn set_smooth_time(&mut self, smooth_time_secs: f32, sample_rate: f32) {
        self.smooth_samples = (smooth_time_secs * sample_rate).max(1.0) as u32;
    }

    #[inline]
    pub fn skip_to_target(&mut self) {
        self.current = self.target;
        self.step = 0.0;
        self.samples_remaining = 0;
    }
}

impl Default for SmoothedValue {
    fn default() -> Self {
        Self::new(0.0, 0.005, 44100.0) // 5ms default at 44.1kHz
    }
}
