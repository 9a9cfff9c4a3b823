use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, Stream, StreamConfig,
};

use super::engine::AudioEngine;

/// Drives an `AudioEngine` from a CPAL output stream: one device callback is
/// one block. The stream itself is output-only and plays silence; the
/// script's signal is the engine's output parameter.
pub struct StreamHost {
    _stream: Stream,
    pub sample_rate: u32,
    pub channels: usize,
}

impl StreamHost {
    /// Open `device_name` (or the default output device) and start the stream.
    /// The engine is moved onto the real-time thread.
    pub fn start(engine: AudioEngine, device_name: Option<&str>) -> Result<Self, String> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| format!("Device enumeration error: {e}"))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| format!("Output device not found: {name}"))?,
            None => host
                .default_output_device()
                .ok_or("No default audio output device found")?,
        };

        let config = device
            .default_output_config()
            .map_err(|e| format!("Default config error: {e}"))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        log::info!(
            "Audio device: {} | sample rate: {} | channels: {}",
            device.name().unwrap_or_default(),
            sample_rate,
            channels
        );

        let stream = build_stream(&device, &config.into(), engine, channels)?;
        stream.play().map_err(|e| format!("Stream play error: {e}"))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    mut engine: AudioEngine,
    channels: usize,
) -> Result<Stream, String> {
    let err_fn = |e| log::error!("CPAL stream error: {e}");

    device
        .build_output_stream(
            config,
            move |output: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                audio_callback(output, &mut engine, channels);
            },
            err_fn,
            None,
        )
        .map_err(|e| format!("Build stream error: {e}"))
}

// ── Real-time audio callback ─────────────────────────────────────────────────
//
// Runs on the CPAL real-time thread. No I/O and no `log` calls here; script
// output and errors go to the output log ring. The only lock is the engine's
// try_lock on the compile slot.
fn audio_callback(output: &mut [f32], engine: &mut AudioEngine, channels: usize) {
    output.fill(0.0);
    let frames = output.len() / channels.max(1);
    engine.process_block(frames);
}
