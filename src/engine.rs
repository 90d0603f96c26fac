//! The per-block orchestrator tying detection, mapping, retune and shifting
//! together.
//!
//! [`PitchlockEngine`] owns one detector, one mapper, one retune engine, and
//! one shifter per channel. Each block it mixes the input down to a mono
//! analysis signal, measures the pitch once, chooses the target frequency,
//! derives the smoothed ratio, and runs every channel's shifter over the same
//! ratio. Between the mapper and the retune stage sits the target-selection
//! logic: the confidence gate, the MIDI override, the note hysteresis
//! dead-band, and the tolerance-proportional correction. None of the
//! processing path allocates, locks, or logs.

use crate::{ParameterSnapshot, Result};
use pitchlock_core::{
    frequency_to_midi, midi_to_frequency, HeldNoteTracker, NoteEvent, Telemetry,
};
use pitchlock_dsp::{
    PitchDetector, PitchEstimate, PitchShifter, RetuneEngine, RetuneSettings, ScaleMapper,
    ScaleSettings, ShifterKind, VOICING_THRESHOLD,
};
use std::sync::Arc;
use tracing::debug;

/// Complete pitch-correction pipeline for one audio stream.
///
/// Construct with [`builder()`](PitchlockEngine::builder), configure through
/// [`set_parameters`](PitchlockEngine::set_parameters), and call
/// [`process`](PitchlockEngine::process) once per block from the audio
/// callback. Telemetry getters are safe from any thread.
///
/// # Example
///
/// ```
/// use pitchlock::{ParameterSnapshot, PitchlockEngine, ScaleType};
///
/// let mut engine = PitchlockEngine::builder()
///     .sample_rate(48_000.0)
///     .max_block_size(256)
///     .channels(1)
///     .build()?;
///
/// let mut params = ParameterSnapshot::default();
/// params.scale_type = ScaleType::Major;
/// engine.set_parameters(&params);
///
/// let mut block = [0.0f32; 256];
/// let mut channels: [&mut [f32]; 1] = [&mut block];
/// engine.process(&mut channels);
/// # Ok::<(), pitchlock::Error>(())
/// ```
pub struct PitchlockEngine {
    sample_rate: f32,
    max_block_size: usize,
    shifter_kind: ShifterKind,
    params: ParameterSnapshot,

    detector: PitchDetector,
    mapper: ScaleMapper,
    retune: RetuneEngine,
    /// One shifter per channel, all driven by the same ratio curve.
    shifters: Vec<Box<dyn PitchShifter + Send>>,

    held: HeldNoteTracker,
    telemetry: Arc<Telemetry>,

    /// Mono analysis mix, sized to the maximum block.
    mono: Vec<f32>,
    /// Dry copy of the channel being shifted, for the formant mix.
    scratch: Vec<f32>,

    /// Frequency fed to the retune stage on the last corrected block;
    /// held through dropouts. 0 until the first lock.
    last_target_hz: f32,
    /// Note the hysteresis dead-band is anchored on.
    active_target_note: Option<i32>,
}

impl PitchlockEngine {
    /// Create a new engine builder.
    pub fn builder() -> crate::PitchlockEngineBuilder {
        crate::PitchlockEngineBuilder::default()
    }

    pub(crate) fn new(
        sample_rate: f32,
        max_block_size: usize,
        channels: usize,
        shifter_kind: ShifterKind,
        params: ParameterSnapshot,
    ) -> Self {
        let mut engine = Self {
            sample_rate,
            max_block_size,
            shifter_kind,
            params,
            detector: PitchDetector::new(sample_rate),
            mapper: ScaleMapper::default(),
            retune: RetuneEngine::new(sample_rate),
            shifters: (0..channels)
                .map(|_| shifter_kind.create(sample_rate, max_block_size))
                .collect(),
            held: HeldNoteTracker::new(),
            telemetry: Arc::new(Telemetry::new()),
            mono: vec![0.0; max_block_size],
            scratch: vec![0.0; max_block_size],
            last_target_hz: 0.0,
            active_target_note: None,
        };
        engine.apply_parameters();
        engine
    }

    /// Reallocate for a new sample rate and maximum block size.
    ///
    /// Idempotent; call off the audio thread whenever the host renegotiates
    /// its stream format. Clears all carried state like [`reset`](Self::reset).
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> Result<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(pitchlock_core::Error::InvalidSampleRate(sample_rate).into());
        }
        if max_block_size == 0 {
            return Err(pitchlock_core::Error::InvalidBlockSize(max_block_size).into());
        }

        debug!(
            sample_rate,
            max_block_size,
            channels = self.shifters.len(),
            "engine prepare"
        );

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.detector = PitchDetector::new(sample_rate);
        self.retune = RetuneEngine::new(sample_rate);
        let channels = self.shifters.len();
        self.shifters = (0..channels)
            .map(|_| self.shifter_kind.create(sample_rate, max_block_size))
            .collect();
        self.mono = vec![0.0; max_block_size];
        self.scratch = vec![0.0; max_block_size];
        self.apply_parameters();
        self.clear_state();
        Ok(())
    }

    /// Drop every carried value so the next block starts clean.
    ///
    /// No allocation; safe between any two blocks.
    pub fn reset(&mut self) {
        debug!("engine reset");
        self.detector.reset();
        self.retune.reset();
        for shifter in &mut self.shifters {
            shifter.reset();
        }
        self.clear_state();
    }

    fn clear_state(&mut self) {
        self.held.clear();
        self.telemetry.reset();
        self.last_target_hz = 0.0;
        self.active_target_note = None;
    }

    /// Replace the full parameter set. Takes effect on the next block.
    pub fn set_parameters(&mut self, params: &ParameterSnapshot) {
        self.params = *params;
        self.apply_parameters();
    }

    fn apply_parameters(&mut self) {
        let params = &self.params;
        self.detector.set_input_type(params.input_type);
        self.detector.set_tracking(params.tracking);
        self.mapper.set_settings(ScaleSettings {
            scale_type: params.scale_type,
            root: params.root % 12,
            custom_mask: params.custom_mask,
            transpose: params.transpose.clamp(-24, 24),
            detune_cents: params.detune_cents.clamp(-100.0, 100.0),
        });
        self.retune.set_settings(RetuneSettings {
            retune_speed_ms: params.retune_speed_ms.clamp(0.0, 400.0),
            vibrato_tracking: params.vibrato_tracking.clamp(0.0, 1.0),
            humanize: params.humanize.clamp(0.0, 1.0),
            note_transition: params.note_transition.clamp(0.0, 1.0),
        });
    }

    pub fn parameters(&self) -> &ParameterSnapshot {
        &self.params
    }

    /// Fold a block's note events into the held-note state.
    pub fn push_midi(&mut self, events: &[NoteEvent]) {
        for event in events {
            self.held.handle(event.msg);
        }
    }

    /// The note currently steering the MIDI override, if any.
    pub fn held_note(&self) -> Option<u8> {
        self.held.held()
    }

    /// Correct one block in place. Planar layout, one slice per channel,
    /// every channel the same length, at most the built maximum block size.
    pub fn process(&mut self, buffer: &mut [&mut [f32]]) {
        let channels = buffer.len().min(self.shifters.len());
        if channels == 0 || buffer[0].is_empty() {
            return;
        }
        let n = buffer[0].len().min(self.max_block_size);

        self.mono[..n].fill(0.0);
        for channel in buffer[..channels].iter() {
            for (mixed, &sample) in self.mono[..n].iter_mut().zip(channel[..n].iter()) {
                *mixed += sample;
            }
        }
        let gain = 1.0 / channels as f32;
        for sample in &mut self.mono[..n] {
            *sample *= gain;
        }

        let estimate = self.detector.process(&self.mono[..n]);

        if self.params.bypass {
            self.telemetry.store(
                estimate.frequency,
                0.0,
                estimate.confidence,
                1.0,
                estimate.is_voiced(),
            );
            return;
        }

        match self.select_target(&estimate) {
            Some(target_hz) => {
                let ratio = self.retune.process(estimate.frequency, target_hz, n);
                self.last_target_hz = target_hz;
                self.shift_channels(buffer, channels, n, ratio, &estimate);
                self.telemetry.store(
                    estimate.frequency,
                    target_hz,
                    estimate.confidence,
                    ratio,
                    estimate.is_voiced(),
                );
            }
            None => {
                // Nothing to correct: hold the ratio, let the shifters pass
                // through and flush their grains
                let ratio = self.retune.process(0.0, 0.0, n);
                let idle = PitchEstimate::default();
                self.shift_channels(buffer, channels, n, ratio, &idle);
                self.telemetry.store(
                    estimate.frequency,
                    0.0,
                    estimate.confidence,
                    ratio,
                    estimate.is_voiced(),
                );
            }
        }
    }

    fn shift_channels(
        &mut self,
        buffer: &mut [&mut [f32]],
        channels: usize,
        n: usize,
        ratio: f32,
        estimate: &PitchEstimate,
    ) {
        let formant = self.params.formant_preserve.clamp(0.0, 1.0);
        // Skip the mix on passthrough blocks; wet and dry are identical there
        // and the equal-power gains would sum above unity
        let mix = formant > 0.0 && estimate.confidence >= VOICING_THRESHOLD;
        let wet_gain = (1.0 - formant).sqrt();
        let dry_gain = formant.sqrt();

        let scratch = &mut self.scratch;
        let shifters = &mut self.shifters;
        for (channel, shifter) in buffer[..channels].iter_mut().zip(shifters.iter_mut()) {
            scratch[..n].copy_from_slice(&channel[..n]);
            shifter.process(
                &scratch[..n],
                &mut channel[..n],
                ratio,
                estimate.period,
                estimate.confidence,
            );
            if mix {
                for (wet, &dry) in channel[..n].iter_mut().zip(scratch[..n].iter()) {
                    *wet = (*wet * wet_gain + dry * dry_gain).clamp(-1.0, 1.0);
                }
            }
        }
    }

    /// Choose the frequency the retune stage chases this block, or `None`
    /// when correction should sit out entirely.
    fn select_target(&mut self, estimate: &PitchEstimate) -> Option<f32> {
        // Tracked vibrato wants a lower bar before the target starts moving.
        // This gate only decides when the target may move; the shifters keep
        // their own voicing gate on resynthesis
        let lock_threshold =
            0.18 + self.params.vibrato_tracking.clamp(0.0, 1.0) * (0.06 - 0.18);
        if estimate.frequency <= 0.0 || estimate.confidence < lock_threshold {
            if self.last_target_hz > 0.0 {
                return Some(self.last_target_hz);
            }
            return None;
        }

        let detune = self.params.detune_cents.clamp(-100.0, 100.0) * 0.01;

        // A held MIDI note overrides the snap outright; transpose and scale
        // do not apply, detune still does
        if self.params.midi_enabled {
            if let Some(note) = self.held.held() {
                self.active_target_note = Some(i32::from(note));
                let hz = midi_to_frequency(f32::from(note) + detune)
                    .clamp(self.detector.min_frequency(), self.detector.max_frequency());
                return Some(hz);
            }
        }

        let raw_midi =
            frequency_to_midi(estimate.frequency) + self.params.transpose.clamp(-24, 24) as f32;
        let mapped = self.mapper.map(estimate.frequency, None);
        let mut note = mapped.target_note_number;

        // Hysteresis: stay on the active note until the raw pitch has left
        // its dead-band, so boundary flutter never retargets
        let band = 0.05 + self.params.note_transition.clamp(0.0, 1.0) * (0.45 - 0.05);
        if let Some(active) = self.active_target_note {
            if note != active && (raw_midi - active as f32).abs() <= 0.5 + band {
                note = active;
            }
        }
        self.active_target_note = Some(note);

        let mut final_midi = note as f32;
        if !self.params.force_correction {
            let tolerance = self.params.tolerance_cents.clamp(0.0, 100.0) / 100.0;
            if tolerance > 0.0 {
                // Small deviations are corrected proportionally less; full
                // correction from one tolerance away
                let delta = final_midi - raw_midi;
                final_midi = raw_midi + delta * (delta.abs() / tolerance).clamp(0.0, 1.0);
            }
        }

        Some(midi_to_frequency(final_midi + detune))
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn channels(&self) -> usize {
        self.shifters.len()
    }

    /// Fixed delay between input and corrected output, for host delay
    /// compensation. Independent of the pitch ratio.
    pub fn latency_samples(&self) -> usize {
        self.shifters.first().map_or(0, |s| s.latency_samples())
    }

    /// Shared handle for UI/host threads to poll without touching the engine.
    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    pub fn last_detected_hz(&self) -> f32 {
        self.telemetry.detected_hz()
    }

    pub fn last_target_hz(&self) -> f32 {
        self.telemetry.target_hz()
    }

    pub fn last_confidence(&self) -> f32 {
        self.telemetry.confidence()
    }

    pub fn last_pitch_ratio(&self) -> f32 {
        self.telemetry.ratio()
    }
}

impl std::fmt::Debug for PitchlockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PitchlockEngine")
            .field("sample_rate", &self.sample_rate)
            .field("max_block_size", &self.max_block_size)
            .field("channels", &self.shifters.len())
            .field("shifter_kind", &self.shifter_kind)
            .finish_non_exhaustive()
    }
}
