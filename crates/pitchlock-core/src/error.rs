//! Error types for pitchlock-core.

use thiserror::Error;

/// Error type for pitchlock-core operations.
///
/// DSP components themselves clamp out-of-range settings instead of failing;
/// these errors cover structural configuration that cannot be clamped into
/// something sensible (a zero block size has no nearest valid value).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid sample rate: {0}. Must be positive and finite")]
    InvalidSampleRate(f32),

    #[error("Invalid block size: {0}. Must be at least 1")]
    InvalidBlockSize(usize),

    #[error("Invalid channel count: {0}. Must be at least 1")]
    InvalidChannelCount(usize),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
