//! Real-time pitch correction DSP.
//!
//! The crate provides the four stages of a correction chain, each usable on
//! its own:
//!
//! ```text
//! audio ──► PitchDetector ──► ScaleMapper ──► RetuneEngine ──► PitchShifter ──► audio
//!              (what is        (what should    (how fast to      (resynthesize
//!               being sung)     be sung)        get there)        at the target)
//! ```
//!
//! Every stage allocates in its constructor and never on the processing
//! path; out-of-range parameters are clamped, never rejected. The stages
//! are glued together per block:
//!
//! ```
//! use pitchlock_dsp::{
//!     PitchDetector, PitchShifter, PsolaShifter, RetuneEngine, ScaleMapper, ScaleSettings,
//! };
//!
//! let mut detector = PitchDetector::new(48_000.0);
//! let mapper = ScaleMapper::new(ScaleSettings::default());
//! let mut retune = RetuneEngine::new(48_000.0);
//! let mut shifter = PsolaShifter::new(48_000.0, 256);
//!
//! let block = [0.0f32; 256];
//! let mut corrected = [0.0f32; 256];
//!
//! let estimate = detector.process(&block);
//! let ratio = if estimate.is_voiced() {
//!     let target = mapper.map(estimate.frequency, None);
//!     retune.process(estimate.frequency, target.target_frequency_hz, block.len())
//! } else {
//!     retune.process(0.0, 0.0, block.len())
//! };
//! shifter.process(&block, &mut corrected, ratio, estimate.period, estimate.confidence);
//! ```

pub mod detector;
pub mod retune;
pub mod scale;
pub mod shift;

pub use detector::{InputType, PitchDetector, PitchEstimate, VOICING_THRESHOLD};
pub use retune::{RetuneEngine, RetuneSettings};
pub use scale::{MapResult, ScaleMapper, ScaleSettings, ScaleType};
pub use shift::{PitchShifter, PsolaShifter, ShifterKind, VocoderShifter};
