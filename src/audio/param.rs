/// `audio/param.rs` — the script's output parameter
///
/// One continuous value in [-1.0, 1.0], written once per processed sample by
/// the audio thread and observable from any thread.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

pub const OUTPUT_MIN: f32 = -1.0;
pub const OUTPUT_MAX: f32 = 1.0;

#[derive(Debug)]
pub struct OutputParameter {
    bits: AtomicU32,
    updates: AtomicU64,
}

impl OutputParameter {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0.0f32.to_bits()),
            updates: AtomicU64::new(0),
        }
    }

    /// Store `value`, clamped to the parameter range.
    pub fn set_value(&self, value: f32) {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(OUTPUT_MIN, OUTPUT_MAX) };
        self.bits.store(clamped.to_bits(), Ordering::Relaxed);
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn value(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Number of `set_value` calls so far.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl Default for OutputParameter {
    fn default() -> Self {
        Self::new()
    }
}

/// `f64` stored as bits, for timing telemetry.
#[derive(Debug, Default)]
pub struct AtomicSeconds(AtomicU64);

impl AtomicSeconds {
    pub fn store(&self, seconds: f64) {
        self.0.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}
