//! MIDI/frequency conversion and note naming.
//!
//! All conversions use equal temperament with A4 = 440 Hz = MIDI 69. MIDI
//! positions are fractional `f32` throughout: pitch correction works in
//! continuous note space and only rounds when it needs a scale degree.

/// Reference tuning frequency (A4).
pub const A4_HZ: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: f32 = 69.0;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Convert a frequency in Hz to a fractional MIDI position.
///
/// The frequency must be positive; pitch detection only reports positive
/// frequencies for voiced input.
#[inline]
pub fn frequency_to_midi(freq_hz: f32) -> f32 {
    A4_MIDI + 12.0 * (freq_hz / A4_HZ).log2()
}

/// Convert a fractional MIDI position to a frequency in Hz.
#[inline]
pub fn midi_to_frequency(midi: f32) -> f32 {
    A4_HZ * 2.0_f32.powf((midi - A4_MIDI) / 12.0)
}

/// Human-readable name for a MIDI note, e.g. `"A4"` or `"C#3"`.
///
/// Octave numbering follows the MIDI convention where note 60 is C4,
/// so note 0 is C-1.
pub fn note_name(midi_note: i32, use_flats: bool) -> String {
    let names = if use_flats { &FLAT_NAMES } else { &SHARP_NAMES };
    let pitch_class = midi_note.rem_euclid(12) as usize;
    let octave = midi_note.div_euclid(12) - 1;
    format!("{}{}", names[pitch_class], octave)
}
