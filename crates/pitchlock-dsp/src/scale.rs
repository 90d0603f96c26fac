//! Maps detected pitch onto the nearest note of a musical scale.
//!
//! Scales are 12-bit pitch-class masks; named scale types are helpers that
//! build a mask from an interval pattern and a root. The mapper itself is a
//! pure function of its settings, so it can run on the audio thread without
//! state or allocation.

use pitchlock_core::{frequency_to_midi, midi_to_frequency};
use serde::{Deserialize, Serialize};

/// All twelve pitch classes set.
const CHROMATIC_MASK: u16 = 0x0FFF;

/// Named scale shapes plus a caller-defined custom mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    Chromatic,
    Major,
    NaturalMinor,
    HarmonicMinor,
    MelodicMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    WholeTone,
    Blues,
    MajorPentatonic,
    MinorPentatonic,
    Diminished,
    Custom,
}

impl ScaleType {
    /// Semitone offsets from the root for the named scales. Chromatic and
    /// Custom have no fixed pattern and return the empty slice.
    fn intervals(self) -> &'static [u8] {
        match self {
            ScaleType::Chromatic | ScaleType::Custom => &[],
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleType::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleType::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleType::WholeTone => &[0, 2, 4, 6, 8, 10],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleType::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleType::Diminished => &[0, 2, 3, 5, 6, 8, 9, 11],
        }
    }

    /// Pitch-class mask for this scale at the given root. `custom_mask` is
    /// consulted only by [`ScaleType::Custom`].
    pub fn mask(self, root: u8, custom_mask: u16) -> u16 {
        match self {
            ScaleType::Chromatic => CHROMATIC_MASK,
            ScaleType::Custom => {
                let mask = custom_mask & CHROMATIC_MASK;
                if mask == 0 {
                    CHROMATIC_MASK
                } else {
                    mask
                }
            }
            _ => self
                .intervals()
                .iter()
                .fold(0u16, |mask, &interval| {
                    mask | 1 << ((u16::from(root) + u16::from(interval)) % 12)
                }),
        }
    }
}

/// Scale selection plus the pitch offsets applied around the snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSettings {
    pub scale_type: ScaleType,
    /// Root pitch class, 0 = C through 11 = B. Reduced mod 12 on use.
    pub root: u8,
    /// Pitch-class set for [`ScaleType::Custom`], low 12 bits.
    pub custom_mask: u16,
    /// Whole semitones added to the detected note before snapping.
    pub transpose: i32,
    /// Cents added to the target after snapping.
    pub detune_cents: f32,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            scale_type: ScaleType::Chromatic,
            root: 0,
            custom_mask: CHROMATIC_MASK,
            transpose: 0,
            detune_cents: 0.0,
        }
    }
}

impl ScaleSettings {
    /// The active pitch-class mask. Never zero; an empty custom mask falls
    /// back to chromatic so mapping always has a candidate.
    pub fn effective_mask(&self) -> u16 {
        self.scale_type.mask(self.root % 12, self.custom_mask)
    }
}

/// Outcome of mapping one detected pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapResult {
    /// Snapped note as fractional MIDI, before detune.
    pub target_midi: f32,
    /// Snapped note as frequency, detune included.
    pub target_frequency_hz: f32,
    /// Snapped note rounded to an integer note number.
    pub target_note_number: i32,
    /// How far the input sat from the chosen note, for display only.
    pub deviation_cents: f32,
}

/// Snaps detected frequencies to the configured scale.
#[derive(Debug, Clone, Default)]
pub struct ScaleMapper {
    settings: ScaleSettings,
}

impl ScaleMapper {
    pub fn new(settings: ScaleSettings) -> Self {
        Self { settings }
    }

    pub fn set_settings(&mut self, settings: ScaleSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &ScaleSettings {
        &self.settings
    }

    /// Map a detected frequency to its correction target.
    ///
    /// With a MIDI override the held note becomes the target directly; scale
    /// and transpose do not apply, detune still does.
    pub fn map(&self, detected_hz: f32, midi_override: Option<u8>) -> MapResult {
        if let Some(note) = midi_override {
            let target_midi = f32::from(note);
            let input_midi = frequency_to_midi(detected_hz);
            return self.result(input_midi, target_midi);
        }

        let input_midi = frequency_to_midi(detected_hz) + self.settings.transpose as f32;
        let target_midi = self.snap(input_midi) as f32;
        self.result(input_midi, target_midi)
    }

    /// Nearest in-scale note within an octave of the rounded input. Scanned
    /// bottom-up with a strict comparison, so of two equidistant candidates
    /// the lower one wins.
    fn snap(&self, input_midi: f32) -> i32 {
        let mask = self.settings.effective_mask();
        let rounded = input_midi.round() as i32;

        let mut best: Option<(i32, f32)> = None;
        for candidate in (rounded - 12)..=(rounded + 12) {
            if mask & (1 << candidate.rem_euclid(12)) == 0 {
                continue;
            }
            let distance = (input_midi - candidate as f32).abs();
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((candidate, distance)),
            }
        }

        // Any 12-bit non-zero mask has a member within the scanned window
        best.map_or(rounded, |(note, _)| note)
    }

    fn result(&self, input_midi: f32, target_midi: f32) -> MapResult {
        let detuned = target_midi + self.settings.detune_cents * 0.01;
        MapResult {
            target_midi,
            target_frequency_hz: midi_to_frequency(detuned),
            target_note_number: target_midi.round() as i32,
            deviation_cents: (input_midi - target_midi) * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn mapper(settings: ScaleSettings) -> ScaleMapper {
        ScaleMapper::new(settings)
    }

    #[test]
    fn c_major_mask_has_the_white_keys() {
        let mask = ScaleType::Major.mask(0, 0);
        assert_eq!(mask, 0b1010_1011_0101, "C D E F G A B");
    }

    #[test]
    fn a_natural_minor_shares_the_c_major_mask() {
        assert_eq!(
            ScaleType::NaturalMinor.mask(9, 0),
            ScaleType::Major.mask(0, 0),
            "relative keys contain the same pitch classes"
        );
    }

    #[test]
    fn root_rotates_the_mask() {
        let d_major = ScaleType::Major.mask(2, 0);
        for class in [2u16, 4, 6, 7, 9, 11, 1] {
            assert_ne!(d_major & (1 << class), 0, "class {} missing", class);
        }
        assert_eq!(d_major.count_ones(), 7);
    }

    #[test]
    fn chromatic_and_empty_custom_use_all_classes() {
        assert_eq!(ScaleType::Chromatic.mask(5, 0), 0x0FFF);
        assert_eq!(ScaleType::Custom.mask(0, 0), 0x0FFF);
        assert_eq!(ScaleType::Custom.mask(0, 0b0101), 0b0101);
        assert_eq!(ScaleType::Custom.mask(0, 0xFFFF), 0x0FFF);
    }

    #[test]
    fn in_scale_note_maps_to_itself() {
        let mapper = mapper(ScaleSettings {
            scale_type: ScaleType::Major,
            ..Default::default()
        });
        let result = mapper.map(440.0, None);

        assert_eq!(result.target_note_number, 69);
        assert_relative_eq!(result.target_frequency_hz, 440.0, max_relative = 1e-5);
        assert!(result.deviation_cents.abs() < 0.01);
    }

    #[test]
    fn out_of_scale_note_snaps_down_on_a_tie() {
        // C#4 sits exactly between C and D in C major
        let mapper = mapper(ScaleSettings {
            scale_type: ScaleType::Major,
            ..Default::default()
        });
        let result = mapper.map(pitchlock_core::midi_to_frequency(61.0), None);

        assert_eq!(result.target_note_number, 60);
        assert_relative_eq!(result.deviation_cents, 100.0, epsilon = 0.1);
    }

    #[test]
    fn sharp_input_snaps_to_the_nearest_scale_note() {
        // 30 cents above A4 stays on A in C major
        let mapper = mapper(ScaleSettings {
            scale_type: ScaleType::Major,
            ..Default::default()
        });
        let result = mapper.map(pitchlock_core::midi_to_frequency(69.3), None);

        assert_eq!(result.target_note_number, 69);
        assert_relative_eq!(result.deviation_cents, 30.0, epsilon = 0.1);
    }

    #[test]
    fn transpose_shifts_before_the_snap() {
        let mapper = mapper(ScaleSettings {
            transpose: 12,
            ..Default::default()
        });
        let result = mapper.map(440.0, None);

        assert_eq!(result.target_note_number, 81);
        assert_relative_eq!(result.target_frequency_hz, 880.0, max_relative = 1e-5);
    }

    #[test]
    fn detune_offsets_the_frequency_not_the_note() {
        let mapper = mapper(ScaleSettings {
            detune_cents: 100.0,
            ..Default::default()
        });
        let result = mapper.map(440.0, None);

        assert_eq!(result.target_note_number, 69);
        assert_relative_eq!(
            result.target_frequency_hz,
            pitchlock_core::midi_to_frequency(70.0),
            max_relative = 1e-5
        );
    }

    #[test]
    fn midi_override_ignores_scale_and_transpose() {
        let mapper = mapper(ScaleSettings {
            scale_type: ScaleType::WholeTone,
            transpose: 7,
            ..Default::default()
        });
        let result = mapper.map(440.0, Some(60));

        assert_eq!(result.target_note_number, 60);
        assert_relative_eq!(result.target_frequency_hz, 261.626, epsilon = 0.01);
    }

    #[test]
    fn midi_override_still_applies_detune() {
        let mapper = mapper(ScaleSettings {
            detune_cents: 50.0,
            ..Default::default()
        });
        let result = mapper.map(440.0, Some(69));

        assert_relative_eq!(
            result.target_frequency_hz,
            pitchlock_core::midi_to_frequency(69.5),
            max_relative = 1e-5
        );
    }

    proptest! {
        #[test]
        fn mask_is_never_zero(
            scale in prop_oneof![
                Just(ScaleType::Chromatic), Just(ScaleType::Major),
                Just(ScaleType::NaturalMinor), Just(ScaleType::HarmonicMinor),
                Just(ScaleType::MelodicMinor), Just(ScaleType::Dorian),
                Just(ScaleType::Phrygian), Just(ScaleType::Lydian),
                Just(ScaleType::Mixolydian), Just(ScaleType::Locrian),
                Just(ScaleType::WholeTone), Just(ScaleType::Blues),
                Just(ScaleType::MajorPentatonic), Just(ScaleType::MinorPentatonic),
                Just(ScaleType::Diminished), Just(ScaleType::Custom),
            ],
            root in 0u8..12,
            custom in proptest::num::u16::ANY,
        ) {
            prop_assert_ne!(scale.mask(root, custom), 0);
        }

        #[test]
        fn snapped_note_is_in_scale(
            hz in 80.0f32..1000.0,
            root in 0u8..12,
        ) {
            let mapper = ScaleMapper::new(ScaleSettings {
                scale_type: ScaleType::Major,
                root,
                ..Default::default()
            });
            let result = mapper.map(hz, None);
            let class = result.target_note_number.rem_euclid(12);
            prop_assert_ne!(
                mapper.settings().effective_mask() & (1 << class),
                0,
                "note {} is outside the scale", result.target_note_number
            );
        }

        #[test]
        fn snap_is_idempotent(
            hz in 80.0f32..1000.0,
            root in 0u8..12,
        ) {
            let mapper = ScaleMapper::new(ScaleSettings {
                scale_type: ScaleType::MinorPentatonic,
                root,
                ..Default::default()
            });
            let first = mapper.map(hz, None);
            let second = mapper.map(first.target_frequency_hz, None);
            prop_assert_eq!(first.target_note_number, second.target_note_number);
        }

        #[test]
        fn snap_never_moves_more_than_a_tritone(
            hz in 80.0f32..1000.0,
            root in 0u8..12,
        ) {
            let mapper = ScaleMapper::new(ScaleSettings {
                scale_type: ScaleType::MajorPentatonic,
                root,
                ..Default::default()
            });
            let result = mapper.map(hz, None);
            let input_midi = pitchlock_core::frequency_to_midi(hz);
            prop_assert!((result.target_midi - input_midi).abs() <= 6.0 + 1e-4);
        }
    }
}
