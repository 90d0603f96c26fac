//! Turns a detected/target frequency pair into a smoothed pitch ratio.
//!
//! The correction character lives here: how fast the ratio chases the
//! target, how much natural vibrato is allowed through, and the slight
//! drift that keeps hard correction from sounding mechanical.

use pitchlock_core::{frequency_to_midi, SmoothedValue};
use std::f32::consts::TAU;

/// Correction behavior controls. All fields are host parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetuneSettings {
    /// Ramp time toward the corrected pitch while holding a note, in ms.
    /// 0 is hard snap (floored at 1 ms internally), 400 is a lazy glide.
    pub retune_speed_ms: f32,
    /// 0 flattens vibrato to the target note, 1 preserves it fully.
    pub vibrato_tracking: f32,
    /// Amount of slow LFO drift plus noise added to the corrected pitch.
    pub humanize: f32,
    /// Scales the ramp time used when the target moves to a new note,
    /// 0 → 5 ms through 1 → 150 ms.
    pub note_transition: f32,
}

impl Default for RetuneSettings {
    fn default() -> Self {
        Self {
            retune_speed_ms: 20.0,
            vibrato_tracking: 0.5,
            humanize: 0.0,
            note_transition: 0.2,
        }
    }
}

/// Pitch-ratio follower between the scale mapper and the shifter.
///
/// Call [`process`](RetuneEngine::process) once per block with the block's
/// detected and target frequencies; it returns the ratio the smoother has
/// reached by the end of the block. [`next_ratio`](RetuneEngine::next_ratio)
/// alternatively advances the smoother one sample at a time for hosts that
/// drive a sample loop.
#[derive(Debug, Clone)]
pub struct RetuneEngine {
    settings: RetuneSettings,
    sample_rate: f32,
    smoother: SmoothedValue,
    last_ratio: f32,
    last_target_note: Option<i32>,
    humanize_phase: f32,
    noise: NoiseSource,
}

impl RetuneEngine {
    pub fn new(sample_rate: f32) -> Self {
        let settings = RetuneSettings::default();
        let smooth_time = (settings.retune_speed_ms / 1000.0).max(0.001);
        Self {
            settings,
            sample_rate,
            smoother: SmoothedValue::new(1.0, smooth_time, sample_rate),
            last_ratio: 1.0,
            last_target_note: None,
            humanize_phase: 0.0,
            noise: NoiseSource::new(),
        }
    }

    pub fn set_settings(&mut self, settings: RetuneSettings) {
        self.settings = settings;
        self.smoother
            .set_smooth_time((settings.retune_speed_ms / 1000.0).max(0.001), self.sample_rate);
    }

    pub fn settings(&self) -> &RetuneSettings {
        &self.settings
    }

    /// Back to unity ratio with no smoothing in flight. The noise source is
    /// re-seeded so a reset transport replays identically.
    pub fn reset(&mut self) {
        self.smoother.set_immediate(1.0);
        self.last_ratio = 1.0;
        self.last_target_note = None;
        self.humanize_phase = 0.0;
        self.noise = NoiseSource::new();
    }

    /// Advance the ratio toward `target_hz / detected_hz` across one block.
    ///
    /// A non-positive frequency on either side means there is nothing to
    /// correct this block: the smoother still advances but the last good
    /// ratio is returned, so the shifter never snaps back to unity mid-note.
    pub fn process(&mut self, detected_hz: f32, target_hz: f32, num_samples: usize) -> f32 {
        if detected_hz <= 0.0 || target_hz <= 0.0 {
            self.smoother.skip(num_samples as u32);
            return self.last_ratio;
        }

        let note_changed = self.note_transition(target_hz);
        let adjusted_target = self.vibrato_adjusted_target(detected_hz, target_hz);
        let mut ratio = (adjusted_target / detected_hz).clamp(0.5, 2.0);
        if self.settings.humanize > 0.0 {
            ratio = self.humanized(ratio, num_samples);
        }

        let smooth_time = if note_changed {
            0.005 + self.settings.note_transition.clamp(0.0, 1.0) * (0.15 - 0.005)
        } else {
            (self.settings.retune_speed_ms / 1000.0).max(0.001)
        };
        self.smoother.set_smooth_time(smooth_time, self.sample_rate);
        self.smoother.set_target(ratio);
        self.smoother.skip(num_samples as u32);

        self.last_ratio = self.smoother.current();
        self.last_ratio
    }

    /// Per-sample smoother advance; pairs with `process(.., 0)` to set the
    /// block's target without consuming it.
    pub fn next_ratio(&mut self) -> f32 {
        self.smoother.next_sample()
    }

    pub fn last_ratio(&self) -> f32 {
        self.last_ratio
    }

    /// Rounded target note changed since the previous voiced block.
    fn note_transition(&mut self, target_hz: f32) -> bool {
        let note = frequency_to_midi(target_hz).round() as i32;
        let changed = match self.last_target_note {
            Some(last) => (note - last).abs() >= 1,
            None => false,
        };
        self.last_target_note = Some(note);
        changed
    }

    /// Fold the sub-semitone deviation of the detected pitch back into the
    /// target, scaled by the tracking amount, so natural vibrato survives
    /// correction instead of being ironed flat.
    fn vibrato_adjusted_target(&self, detected_hz: f32, target_hz: f32) -> f32 {
        let tracking = self.settings.vibrato_tracking;
        if tracking <= 0.01 {
            return target_hz;
        }

        let detected_midi = frequency_to_midi(detected_hz);
        let deviation = detected_midi - detected_midi.round();
        let passed = if tracking >= 0.99 {
            deviation
        } else {
            deviation * tracking
        };
        target_hz * (passed / 12.0).exp2()
    }

    /// Slow sinusoidal drift plus a little noise, applied as a semitone
    /// modulation on the ratio. Weights keep the excursion under a cent.
    fn humanized(&mut self, ratio: f32, num_samples: usize) -> f32 {
        if self.settings.humanize <= 0.01 {
            return ratio;
        }

        self.humanize_phase += 1.5 * num_samples as f32 / self.sample_rate;
        if self.humanize_phase > TAU {
            self.humanize_phase -= TAU;
        }

        let lfo = self.humanize_phase.sin();
        let noise = (self.noise.next_unit() - 0.5) * 0.002;
        let modulation = (lfo * 0.005 + noise) * self.settings.humanize;
        ratio * (modulation / 12.0).exp2()
    }
}

/// xorshift32 with a fixed seed; identical runs correct identically.
#[derive(Debug, Clone)]
struct NoiseSource {
    state: u32,
}

impl NoiseSource {
    fn new() -> Self {
        Self { state: 0x9E37_79B9 }
    }

    /// Uniform in [0, 1).
    fn next_unit(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x >> 8) as f32 / (1u32 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE_RATE: f32 = 48000.0;
    const BLOCK: usize = 256;

    fn settled(engine: &mut RetuneEngine, detected: f32, target: f32) -> f32 {
        let mut ratio = 1.0;
        for _ in 0..100 {
            ratio = engine.process(detected, target, BLOCK);
        }
        ratio
    }

    #[test]
    fn on_pitch_input_settles_at_unity() {
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        let ratio = settled(&mut engine, 440.0, 440.0);
        assert_relative_eq!(ratio, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn ratio_is_clamped_to_an_octave_each_way() {
        let mut up = RetuneEngine::new(SAMPLE_RATE);
        up.set_settings(RetuneSettings {
            retune_speed_ms: 0.0,
            vibrato_tracking: 0.0,
            ..Default::default()
        });
        assert_relative_eq!(settled(&mut up, 100.0, 800.0), 2.0, epsilon = 1e-4);

        let mut down = RetuneEngine::new(SAMPLE_RATE);
        down.set_settings(RetuneSettings {
            retune_speed_ms: 0.0,
            vibrato_tracking: 0.0,
            ..Default::default()
        });
        assert_relative_eq!(settled(&mut down, 800.0, 100.0), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn unvoiced_block_holds_the_last_ratio() {
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        engine.set_settings(RetuneSettings {
            vibrato_tracking: 0.0,
            ..Default::default()
        });
        let locked = settled(&mut engine, 430.0, 440.0);

        let held = engine.process(0.0, 440.0, BLOCK);
        assert_eq!(held, locked, "dropout must not move the ratio");
        let held_again = engine.process(430.0, 0.0, BLOCK);
        assert_eq!(held_again, locked);
    }

    #[test]
    fn zero_tracking_flattens_vibrato() {
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        engine.set_settings(RetuneSettings {
            vibrato_tracking: 0.0,
            ..Default::default()
        });
        let ratio = settled(&mut engine, 430.0, 440.0);
        assert_relative_eq!(ratio, 440.0 / 430.0, epsilon = 1e-4);
    }

    #[test]
    fn full_tracking_passes_the_deviation_through() {
        // Target is the nearest semitone, so full tracking reproduces the
        // detected pitch exactly and the ratio stays at unity
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        engine.set_settings(RetuneSettings {
            vibrato_tracking: 1.0,
            ..Default::default()
        });
        let ratio = settled(&mut engine, 430.0, 440.0);
        assert_relative_eq!(ratio, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn partial_tracking_lands_between_the_extremes() {
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        engine.set_settings(RetuneSettings {
            vibrato_tracking: 0.5,
            ..Default::default()
        });
        let ratio = settled(&mut engine, 430.0, 440.0);
        assert!(
            ratio > 1.0 && ratio < 440.0 / 430.0,
            "expected a partial correction, got {}",
            ratio
        );
    }

    #[test]
    fn note_change_uses_the_transition_ramp() {
        let ideal = pitchlock_core::midi_to_frequency(70.0) / 430.0;

        let run = |note_transition: f32| {
            let mut engine = RetuneEngine::new(SAMPLE_RATE);
            engine.set_settings(RetuneSettings {
                retune_speed_ms: 200.0,
                vibrato_tracking: 0.0,
                note_transition,
                ..Default::default()
            });
            engine.process(430.0, 440.0, BLOCK);
            engine.process(430.0, pitchlock_core::midi_to_frequency(70.0), BLOCK)
        };

        let fast = run(0.0);
        let slow = run(1.0);

        // 5 ms fits inside one 256-sample block at 48 kHz, 150 ms does not
        assert_relative_eq!(fast, ideal, epsilon = 1e-3);
        assert!(
            (slow - ideal).abs() > (fast - ideal).abs() + 1e-3,
            "long transition should still be ramping: slow {} fast {}",
            slow,
            fast
        );
    }

    #[test]
    fn humanize_wobble_stays_under_a_cent() {
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        engine.set_settings(RetuneSettings {
            retune_speed_ms: 0.0,
            vibrato_tracking: 0.0,
            humanize: 1.0,
            ..Default::default()
        });

        let mut ratios = Vec::new();
        for _ in 0..200 {
            ratios.push(engine.process(440.0, 440.0, BLOCK));
        }
        let settled = &ratios[50..];

        let max_excursion_cents = 0.7; // lfo 0.005 + noise 0.001 semitones
        for &ratio in settled {
            let cents = (ratio.log2() * 1200.0).abs();
            assert!(
                cents < max_excursion_cents,
                "humanize drifted {} cents",
                cents
            );
        }
        let min = settled.iter().cloned().fold(f32::MAX, f32::min);
        let max = settled.iter().cloned().fold(f32::MIN, f32::max);
        assert!(max > min, "humanize should actually move the ratio");
    }

    #[test]
    fn next_ratio_walks_to_the_target() {
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        engine.set_settings(RetuneSettings {
            retune_speed_ms: 20.0,
            vibrato_tracking: 0.0,
            ..Default::default()
        });

        engine.process(430.0, 440.0, 0);
        let expected = 440.0 / 430.0;

        let mut previous = 1.0;
        for _ in 0..(SAMPLE_RATE * 0.02) as usize + 1 {
            let ratio = engine.next_ratio();
            assert!(ratio >= previous - 1e-6, "ramp must be monotone upward");
            previous = ratio;
        }
        assert_relative_eq!(previous, expected, epsilon = 1e-4);
    }

    #[test]
    fn reset_returns_to_unity() {
        let mut engine = RetuneEngine::new(SAMPLE_RATE);
        engine.set_settings(RetuneSettings {
            retune_speed_ms: 0.0,
            vibrato_tracking: 0.0,
            ..Default::default()
        });
        settled(&mut engine, 300.0, 450.0);

        engine.reset();
        assert_eq!(engine.last_ratio(), 1.0);
        assert_eq!(engine.process(0.0, 0.0, BLOCK), 1.0);
    }
}
