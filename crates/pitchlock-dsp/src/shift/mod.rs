//! Pitch shifting strategies.
//!
//! Two interchangeable implementations sit behind [`PitchShifter`]:
//! time-domain grain resynthesis ([`PsolaShifter`], the default) and an STFT
//! phase vocoder ([`VocoderShifter`]). PSOLA keeps formants anchored and is
//! cheap, but needs the detector's period estimate; the vocoder needs no
//! cycle marks and tolerates polyphonic spill at the cost of latency and a
//! phasier character.

mod psola;
mod vocoder;

pub use psola::PsolaShifter;
pub use vocoder::VocoderShifter;

/// One channel of pitch shifting. Implementations are constructed for a
/// fixed sample rate and maximum block size and never allocate in
/// [`process`](PitchShifter::process).
pub trait PitchShifter {
    /// Shift `input` into `output` by `pitch_ratio` (2.0 = up an octave).
    ///
    /// `period` and `confidence` carry the detector's estimate for the same
    /// block; strategies that do not need cycle marks ignore them.
    fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        pitch_ratio: f32,
        period: f32,
        confidence: f32,
    );

    /// Fixed algorithmic delay between input and shifted output.
    fn latency_samples(&self) -> usize;

    /// Drop all buffered audio and carried state.
    fn reset(&mut self);
}

/// Strategy selector used by the engine builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShifterKind {
    #[default]
    Psola,
    Vocoder,
}

impl ShifterKind {
    /// Build one shifter channel for this strategy.
    pub fn create(self, sample_rate: f32, max_block_size: usize) -> Box<dyn PitchShifter + Send> {
        match self {
            ShifterKind::Psola => Box::new(PsolaShifter::new(sample_rate, max_block_size)),
            ShifterKind::Vocoder => Box::new(VocoderShifter::new(sample_rate, max_block_size)),
        }
    }
}
