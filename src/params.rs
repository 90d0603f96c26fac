//! The host-facing parameter set.
//!
//! One flat struct carries every user parameter; the host applies it
//! atomically per block with [`set_parameters`](crate::PitchlockEngine::set_parameters)
//! and persists it through the serde derives. Values outside the documented
//! ranges are clamped where they are consumed, so a stale or hand-edited
//! snapshot can never wedge the engine.

use pitchlock_dsp::{InputType, ScaleType};
use serde::{Deserialize, Serialize};

/// Complete engine configuration as the host sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    /// Frequency-range preset for the source material.
    pub input_type: InputType,

    /// Scale the correction snaps to.
    pub scale_type: ScaleType,
    /// Root pitch class, 0 = C through 11 = B.
    pub root: u8,
    /// Pitch-class set for [`ScaleType::Custom`], low 12 bits.
    pub custom_mask: u16,
    /// Display note names with flats instead of sharps.
    pub use_flats: bool,

    /// Whole semitones added before the snap, -24..=24.
    pub transpose: i32,
    /// Cents added to the target after the snap, -100..=100.
    pub detune_cents: f32,

    /// Ramp time toward the corrected pitch in ms, 0..=400.
    pub retune_speed_ms: f32,
    /// Detection leniency, 0 (strict) to 1 (loose).
    pub tracking: f32,

    /// Drift/noise wobble on the corrected pitch, 0..=1.
    pub humanize: f32,
    /// 0 flattens vibrato, 1 preserves it fully.
    pub vibrato_tracking: f32,
    /// Speed and stickiness of moves to a new note, 0..=1.
    pub note_transition: f32,

    /// Deviation below which correction is proportionally reduced, 0..=100
    /// cents. Ignored while `force_correction` is set.
    pub tolerance_cents: f32,
    /// Always correct fully, regardless of tolerance.
    pub force_correction: bool,

    /// Dry timbre blended back after shifting, 0..=1.
    pub formant_preserve: f32,

    /// Let a held MIDI note override the scale snap.
    pub midi_enabled: bool,
    /// Pass audio through untouched; detection keeps running for meters.
    pub bypass: bool,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            input_type: InputType::AltoTenor,
            scale_type: ScaleType::Chromatic,
            root: 0,
            custom_mask: 0x0FFF,
            use_flats: false,
            transpose: 0,
            detune_cents: 0.0,
            retune_speed_ms: 20.0,
            tracking: 0.5,
            humanize: 0.0,
            vibrato_tracking: 0.5,
            note_transition: 0.2,
            tolerance_cents: 10.0,
            force_correction: false,
            formant_preserve: 0.5,
            midi_enabled: false,
            bypass: false,
        }
    }
}
