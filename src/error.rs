//! Centralized error type for the pitchlock umbrella crate.
//!
//! Wraps member-crate errors so `?` propagates naturally across crate
//! boundaries. All errors are construction-time; once an engine builds,
//! the audio path has no fallible calls.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] pitchlock_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
