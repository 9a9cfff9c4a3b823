use std::{
    sync::{Arc, Mutex, PoisonError, TryLockError},
    time::Instant,
};

use serde::{Deserialize, Serialize};

use super::{
    param::{AtomicSeconds, OutputParameter, OUTPUT_MAX, OUTPUT_MIN},
    ring_buffer::RingBuffer,
};
use crate::scripting::{
    engine::ScriptEngine,
    output_log::{LogEntry, SharedOutputLog},
};

pub const MONITOR_BUFFER_SIZE: usize = 400;
/// Processed samples per monitor point.
pub const MONITOR_DECIMATION: usize = 1200;

pub type OutputMonitor = RingBuffer<f32, MONITOR_BUFFER_SIZE>;

// ── Telemetry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Timings {
    pub last_compile_seconds: f64,
    pub last_block_seconds: f64,
}

// ── Shared state ─────────────────────────────────────────────────────────────

/// Everything the control thread and the audio thread both touch.
///
/// The compile-request slot is the only lock; it is taken once per block by
/// the audio thread and only long enough to move the pending string out.
/// The log and monitor rings are written by the audio thread alone.
pub struct EngineShared {
    compile_request: Mutex<Option<String>>,
    pub log: SharedOutputLog,
    pub monitor: OutputMonitor,
    pub output: OutputParameter,
    last_compile_seconds: AtomicSeconds,
    last_block_seconds: AtomicSeconds,
}

impl EngineShared {
    fn new() -> Self {
        Self {
            compile_request: Mutex::new(None),
            log: SharedOutputLog::new(),
            monitor: OutputMonitor::new(),
            output: OutputParameter::new(),
            last_compile_seconds: AtomicSeconds::default(),
            last_block_seconds: AtomicSeconds::default(),
        }
    }

    /// Queue `source` for compilation at the next block boundary.
    /// Replaces any request that has not been picked up yet.
    pub fn request_compile(&self, source: String) {
        let mut slot = self
            .compile_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.replace(source).is_some() {
            log::debug!("Pending compile request superseded");
        }
    }

    pub fn has_pending_compile(&self) -> bool {
        self.compile_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn timings(&self) -> Timings {
        Timings {
            last_compile_seconds: self.last_compile_seconds.load(),
            last_block_seconds: self.last_block_seconds.load(),
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Audio-thread side of the scripted signal source.
///
/// Construct on any thread, hand `shared()` to the control side, then move
/// the engine into the audio callback and call `process_block` once per block.
pub struct AudioEngine {
    script: ScriptEngine,
    shared: Arc<EngineShared>,
    monitor_counter: usize,
}

impl AudioEngine {
    pub fn new() -> Result<Self, String> {
        let shared = Arc::new(EngineShared::new());
        let script = ScriptEngine::new()?;

        let log_target = Arc::clone(&shared);
        script.set_print_callback(move |line| log_target.log.add(LogEntry::text(&line)));

        // Start the monitor as a full flat line.
        for _ in 0..MONITOR_BUFFER_SIZE {
            shared.monitor.add(0.0);
        }

        log::info!(
            "Script engine ready | monitor: {} points every {} samples",
            MONITOR_BUFFER_SIZE,
            MONITOR_DECIMATION
        );

        Ok(Self {
            script,
            shared,
            monitor_counter: 0,
        })
    }

    pub fn shared(&self) -> Arc<EngineShared> {
        Arc::clone(&self.shared)
    }

    pub fn script(&self) -> &ScriptEngine {
        &self.script
    }

    pub fn has_instance(&self) -> bool {
        self.script.has_instance()
    }

    pub fn set_package_path(&self, dir: &str) -> Result<(), String> {
        self.script.set_package_path(dir)
    }

    /// Process one block of `num_samples` samples.
    ///
    /// Picks up a pending compile request first, then runs the script once
    /// per sample. Without a compiled instance the block is left alone.
    pub fn process_block(&mut self, num_samples: usize) {
        self.apply_compile_request();

        if !self.script.has_instance() {
            return;
        }

        let start = Instant::now();

        for _ in 0..num_samples {
            self.monitor_counter += 1;

            let value = match self.script.run_instance() {
                Ok(result) => clamp_output(result),
                Err(e) => {
                    self.shared.log.add(LogEntry::error(&e));
                    0.0
                }
            };

            self.shared.output.set_value(value);

            if self.monitor_counter >= MONITOR_DECIMATION {
                self.shared.monitor.add(value);
                self.monitor_counter = 0;
            }
        }

        self.shared.last_block_seconds.store(start.elapsed().as_secs_f64());
    }

    fn apply_compile_request(&mut self) {
        // Never wait on the control thread; a contended slot is retried next block.
        let pending = match self.shared.compile_request.try_lock() {
            Ok(mut slot) => slot.take(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().take(),
            Err(TryLockError::WouldBlock) => return,
        };

        let Some(source) = pending else {
            return;
        };

        // Outcome is reported through the output log only; the control
        // thread decides what reaches `log`.
        let start = Instant::now();
        if let Err(e) = self.script.compile(&source) {
            self.shared.log.add(LogEntry::error(&e));
        }
        self.shared.last_compile_seconds.store(start.elapsed().as_secs_f64());
    }
}

fn clamp_output(result: f64) -> f32 {
    let value = result as f32;
    if value.is_nan() {
        0.0
    } else {
        value.clamp(OUTPUT_MIN, OUTPUT_MAX)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
