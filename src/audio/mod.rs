/// `audio/` — real-time side of the scripted signal source
///
/// `AudioEngine` runs the compiled script once per sample inside the audio
/// callback. Everything it shares with the control thread goes through
/// `EngineShared`: a mutex-guarded compile slot and lock-free telemetry rings.
pub mod engine;
pub mod host;
pub mod param;
pub mod ring_buffer;
