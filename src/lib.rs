//! # Pitchlock - Real-time Pitch Correction
//!
//! Detects the pitch of a monophonic signal, decides which note the
//! performer meant, and resynthesizes the audio at the corrected pitch while
//! keeping timing, loudness, and formants intact.
//!
//! ## Architecture
//!
//! Pitchlock is an umbrella crate that coordinates:
//! - **pitchlock-core** - Foundation primitives (value smoothing, note math,
//!   history buffers, note events, lock-free telemetry)
//! - **pitchlock-dsp** - The correction chain (PitchDetector, ScaleMapper,
//!   RetuneEngine, PSOLA and phase-vocoder shifters)
//!
//! The umbrella adds the [`PitchlockEngine`] orchestrator: per-channel
//! shifters, target selection with hysteresis and tolerance, the MIDI
//! override, the formant dry/wet mix, and host-pollable telemetry.
//!
//! ## Quick Start
//!
//! ```
//! use pitchlock::prelude::*;
//!
//! let mut engine = PitchlockEngine::builder()
//!     .sample_rate(48_000.0)
//!     .max_block_size(256)
//!     .channels(1)
//!     .build()?;
//!
//! // Snap everything hard onto A minor
//! let mut params = ParameterSnapshot::default();
//! params.scale_type = ScaleType::NaturalMinor;
//! params.root = 9;
//! params.force_correction = true;
//! engine.set_parameters(&params);
//!
//! // In the audio callback: planar channels, corrected in place
//! let mut block = [0.0f32; 256];
//! let mut channels: [&mut [f32]; 1] = [&mut block];
//! engine.process(&mut channels);
//!
//! // From the UI thread
//! let detected = engine.last_detected_hz();
//! # Ok::<(), pitchlock::Error>(())
//! ```
//!
//! ## Realtime guarantees
//!
//! Everything is allocated at build time for the declared maximum block size
//! and channel count. `process()` never allocates, locks, or logs; failure
//! modes degrade to passthrough or hold-last-value, never to an error.

/// Re-export of pitchlock-core for direct access
pub use pitchlock_core as core;

/// Re-export of pitchlock-dsp for direct access
pub use pitchlock_dsp as dsp;

// Foundation types
pub use pitchlock_core::{
    frequency_to_midi, midi_to_frequency, note_name, HeldNoteTracker, HistoryBuffer, NoteEvent,
    NoteMsg, SmoothedValue, Telemetry, A4_HZ, A4_MIDI,
};

// Correction chain
pub use pitchlock_dsp::{
    InputType, MapResult, PitchDetector, PitchEstimate, PitchShifter, PsolaShifter, RetuneEngine,
    RetuneSettings, ScaleMapper, ScaleSettings, ScaleType, ShifterKind, VocoderShifter,
};

mod builder;
mod engine;
mod error;
mod params;

pub use builder::PitchlockEngineBuilder;
pub use engine::PitchlockEngine;
pub use error::{Error, Result};
pub use params::ParameterSnapshot;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{ParameterSnapshot, PitchlockEngine, PitchlockEngineBuilder};

    // Host-facing enums
    pub use crate::{InputType, ScaleType, ShifterKind};

    // Note input
    pub use crate::{NoteEvent, NoteMsg};

    // Note math
    pub use crate::{frequency_to_midi, midi_to_frequency, note_name};
}
