//! Test helpers and fixtures for Pitchlock integration tests.
//!
//! Signal generators are deterministic (fixed-phase sines, seeded noise) so
//! every run of the pipeline is reproducible sample for sample.
//!
//! ## Tolerance levels
//!
//! Use the appropriate tolerance from [`tolerances`]:
//! - `FLOAT_EPSILON` (1e-6): exact operations (passthrough, held values)
//! - `SILENCE_THRESHOLD` (0.0001): silence detection (-80dB)
//! - `TARGET_SETTLE_HZ` / `TARGET_JUMP_HZ`: pitch convergence in Hz

pub mod tolerances;

use pitchlock::{ParameterSnapshot, PitchlockEngine, ShifterKind};

/// Default test sample rate (matches common hardware).
pub const TEST_SAMPLE_RATE: f32 = 48000.0;

/// Standard block size for deterministic testing.
pub const TEST_BLOCK_SIZE: usize = 256;

/// Create a mono correction engine with the given parameters.
pub fn test_engine(params: ParameterSnapshot) -> PitchlockEngine {
    test_engine_with(params, 1, ShifterKind::Psola)
}

/// Create an engine with explicit channel count and shifting strategy.
pub fn test_engine_with(
    params: ParameterSnapshot,
    channels: usize,
    shifter: ShifterKind,
) -> PitchlockEngine {
    PitchlockEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .max_block_size(TEST_BLOCK_SIZE)
        .channels(channels)
        .shifter(shifter)
        .parameters(params)
        .build()
        .expect("failed to create test engine")
}

/// Parameters that correct hard and fast: chromatic scale, force correction,
/// 1 ms retune, vibrato flattened, no humanize, no dry mix.
pub fn hard_correction_params() -> ParameterSnapshot {
    let mut params = ParameterSnapshot::default();
    params.force_correction = true;
    params.retune_speed_ms = 1.0;
    params.vibrato_tracking = 0.0;
    params.humanize = 0.0;
    params.formant_preserve = 0.0;
    params
}

/// Generate a sine wave at the given frequency.
pub fn generate_sine(frequency: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * frequency as f64 * t).sin() as f32
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Generate reproducible white noise in -1..1.
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Run a mono signal through the engine block by block, in place.
///
/// Returns the corrected signal; the engine keeps its state so successive
/// calls continue the same stream.
pub fn process_mono(engine: &mut PitchlockEngine, input: &[f32]) -> Vec<f32> {
    let mut output = input.to_vec();
    for block in output.chunks_mut(TEST_BLOCK_SIZE) {
        let mut channels: [&mut [f32]; 1] = [block];
        engine.process(&mut channels);
    }
    output
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Assert that every sample is finite (no NaN/Inf escaped the pipeline).
pub fn assert_finite(samples: &[f32]) {
    for (i, &sample) in samples.iter().enumerate() {
        assert!(sample.is_finite(), "non-finite sample {} at index {}", sample, i);
    }
}

/// Assert that a signal is approximately silent.
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(max <= tolerance, "expected silence, but peak amplitude was {}", max);
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let level = rms(samples);
    assert!(
        level >= min_rms,
        "expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        level
    );
}
