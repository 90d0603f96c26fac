//! Note input for MIDI-targeted correction.
//!
//! The engine does not parse raw MIDI bytes; hosts hand it [`NoteEvent`]s
//! already split into on/off with a sample-accurate frame offset. A
//! [`HeldNoteTracker`] folds those events into "the note the performer is
//! holding right now", which is what target selection actually needs.

/// RT-safe note event with sample-accurate timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    /// Offset within the current buffer (0 = first sample).
    pub frame_offset: usize,
    pub msg: NoteMsg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteMsg {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl NoteEvent {
    #[inline]
    pub fn note_on(frame_offset: usize, note: u8, velocity: u8) -> Self {
        Self {
            frame_offset,
            msg: NoteMsg::NoteOn { note, velocity },
        }
    }

    #[inline]
    pub fn note_off(frame_offset: usize, note: u8) -> Self {
        Self {
            frame_offset,
            msg: NoteMsg::NoteOff { note },
        }
    }
}

/// Tracks the most recently pressed, still-held note.
///
/// Monophonic last-note priority: a new note-on replaces the held note, and a
/// note-off only releases the note it names. A note-on with velocity 0 is
/// treated as a note-off, per MIDI convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeldNoteTracker {
    held: Option<u8>,
}

impl HeldNoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, msg: NoteMsg) {
        match msg {
            NoteMsg::NoteOn { note, velocity } if velocity > 0 => self.held = Some(note),
            NoteMsg::NoteOn { note, .. } | NoteMsg::NoteOff { note } => {
                if self.held == Some(note) {
                    self.held = None;
                }
            }
        }
    }

    /// The note the performer is currently holding, if any.
    #[inline]
    pub fn held(&self) -> Option<u8> {
        self.held
    }

    pub fn clear(&mut self) {
        self.held = None;
    }
}
