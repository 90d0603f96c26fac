//! Builder for configuring and constructing a `PitchlockEngine`.

use crate::{ParameterSnapshot, PitchlockEngine, Result};
use pitchlock_dsp::ShifterKind;
use tracing::debug;

/// Validating configuration for [`PitchlockEngine`].
///
/// All knobs that size buffers live here; everything runtime-tunable goes
/// through [`ParameterSnapshot`] instead. Building allocates every internal
/// buffer for the worst case, so the finished engine never allocates on the
/// audio thread.
///
/// # Example
///
/// ```
/// use pitchlock::{PitchlockEngine, ShifterKind};
///
/// let engine = PitchlockEngine::builder()
///     .sample_rate(44_100.0)
///     .max_block_size(512)
///     .channels(2)
///     .shifter(ShifterKind::Psola)
///     .build()?;
///
/// assert_eq!(engine.channels(), 2);
/// # Ok::<(), pitchlock::Error>(())
/// ```
pub struct PitchlockEngineBuilder {
    sample_rate: f32,
    max_block_size: usize,
    channels: usize,
    shifter: ShifterKind,
    parameters: ParameterSnapshot,
}

impl Default for PitchlockEngineBuilder {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_block_size: 512,
            channels: 2,
            shifter: ShifterKind::default(),
            parameters: ParameterSnapshot::default(),
        }
    }
}

impl PitchlockEngineBuilder {
    /// Default: 48000.0
    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Largest block `process` will ever see. Default: 512
    pub fn max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    /// Default: 2
    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Pitch-shifting strategy. Default: [`ShifterKind::Psola`]
    pub fn shifter(mut self, shifter: ShifterKind) -> Self {
        self.shifter = shifter;
        self
    }

    /// Initial parameter set, replacing the defaults.
    pub fn parameters(mut self, parameters: ParameterSnapshot) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn build(self) -> Result<PitchlockEngine> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(pitchlock_core::Error::InvalidSampleRate(self.sample_rate).into());
        }
        if self.max_block_size == 0 {
            return Err(pitchlock_core::Error::InvalidBlockSize(self.max_block_size).into());
        }
        if self.channels == 0 {
            return Err(pitchlock_core::Error::InvalidChannelCount(self.channels).into());
        }

        debug!(
            sample_rate = self.sample_rate,
            max_block_size = self.max_block_size,
            channels = self.channels,
            shifter = ?self.shifter,
            "building engine"
        );

        Ok(PitchlockEngine::new(
            self.sample_rate,
            self.max_block_size,
            self.channels,
            self.shifter,
            self.parameters,
        ))
    }
}
