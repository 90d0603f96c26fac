//! Shared primitives for the Pitchlock pitch-correction engine.
//!
//! Everything in this crate is allocation-free after construction and safe to
//! call from an audio callback:
//! - [`SmoothedValue`]: linear per-sample parameter smoothing
//! - [`HistoryBuffer`]: circular sample history with absolute-position reads
//! - [`NoteEvent`] / [`HeldNoteTracker`]: sample-stamped note input
//! - [`Telemetry`]: lock-free meter values for UI readers
//! - note math: MIDI/frequency conversion and note naming

mod error;
pub use error::{Error, Result};

mod smooth;
pub use smooth::SmoothedValue;

mod history;
pub use history::HistoryBuffer;

mod note;
pub use note::{frequency_to_midi, midi_to_frequency, note_name, A4_HZ, A4_MIDI};

mod midi;
pub use midi::{HeldNoteTracker, NoteEvent, NoteMsg};

mod telemetry;
pub use telemetry::{AtomicFlag, AtomicFloat, Telemetry};
