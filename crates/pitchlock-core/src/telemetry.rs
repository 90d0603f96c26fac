//! Lock-free meter values shared between the audio thread and UI readers.
//!
//! The audio thread publishes one [`Telemetry`] update per processed block;
//! any number of reader threads may poll it at their own rate. Readers never
//! block the audio thread and may observe values from two adjacent blocks,
//! which is fine for metering.

use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF32;

/// Cache-line aligned atomic f32.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn get_relaxed(&self) -> f32 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }
}

impl Clone for AtomicFloat {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }
}

impl Clone for AtomicFlag {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Per-block correction state for meters and tuning displays.
///
/// `detected_hz` and `target_hz` read 0.0 while the input is unvoiced.
#[derive(Debug, Default)]
pub struct Telemetry {
    detected_hz: AtomicFloat,
    target_hz: AtomicFloat,
    confidence: AtomicFloat,
    ratio: AtomicFloat,
    voiced: AtomicFlag,
}

impl Telemetry {
    pub fn new() -> Self {
        let telemetry = Self::default();
        telemetry.ratio.set(1.0);
        telemetry
    }

    /// Publish one block's worth of correction state. Audio thread only.
    pub fn store(&self, detected_hz: f32, target_hz: f32, confidence: f32, ratio: f32, voiced: bool) {
        self.detected_hz.set(detected_hz);
        self.target_hz.set(target_hz);
        self.confidence.set(confidence);
        self.ratio.set(ratio);
        self.voiced.set(voiced);
    }

    /// Back to the unvoiced idle state (ratio 1.0, everything else 0).
    pub fn reset(&self) {
        self.store(0.0, 0.0, 0.0, 1.0, false);
    }

    #[inline]
    pub fn detected_hz(&self) -> f32 {
        self.detected_hz.get()
    }

    #[inline]
    pub fn target_hz(&self) -> f32 {
        self.target_hz.get()
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence.get()
    }

    #[inline]
    pub fn ratio(&self) -> f32 {
        self.ratio.get()
    }

    #[inline]
    pub fn voiced(&self) -> bool {
        self.voiced.get()
    }
}
