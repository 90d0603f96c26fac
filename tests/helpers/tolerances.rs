//! Tolerance constants for correction testing.
//!
//! Different assertions need different precision: bit-exact passthrough,
//! resynthesis level drift, and pitch convergence all live on different
//! scales.

/// Floating point rounding errors (for passthrough, exact holds).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Silence threshold (~-80dB). Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// How far the settled target may sit from the intended note, in Hz.
/// Matches the detector's 2% accuracy contract at A4.
pub const TARGET_SETTLE_HZ: f32 = 2.0;

/// Convergence tolerance right after a note jump, before the lock has
/// fully re-stabilized.
pub const TARGET_JUMP_HZ: f32 = 3.0;

/// Fraction of the input level the corrected output must retain.
pub const LEVEL_RETENTION: f32 = 0.25;
