/// `commands/monitor_commands.rs` — output log, output monitor and timings
///
/// All reads are best-effort snapshots of the audio thread's telemetry and
/// never block it.
use serde_json::{json, Value};

use crate::{
    audio::engine::Timings,
    scripting::output_log::LogMessage,
    state::AppState,
};

/// Up to 20 log entries, oldest first. Empty while a clear is pending.
pub fn read_log(state: &AppState) -> Result<Vec<LogMessage>, String> {
    Ok(state.engine.log.read().iter().map(LogMessage::from).collect())
}

/// Ask the audio thread to empty the log on its next write.
pub fn clear_log(state: &AppState) -> Result<(), String> {
    state.engine.log.clear();
    Ok(())
}

/// Up to 400 decimated output samples, oldest first.
pub fn read_monitor(state: &AppState) -> Result<Vec<f32>, String> {
    Ok(state.engine.monitor.read())
}

pub fn read_timings(state: &AppState) -> Result<Timings, String> {
    Ok(state.engine.timings())
}

/// Payload of the editor's `outputLogUpdate` event:
/// `[compileSeconds, blockSeconds, [text, kind]...]`, kind `"0"` text / `"1"` error.
pub fn output_log_update(state: &AppState) -> Value {
    let timings = state.engine.timings();
    let mut payload = vec![
        json!(timings.last_compile_seconds),
        json!(timings.last_block_seconds),
    ];
    if !state.engine.log.is_clear_pending() {
        payload.extend(
            state
                .engine
                .log
                .read()
                .iter()
                .map(|entry| json!([entry.as_str(), entry.kind.code().to_string()])),
        );
    }
    Value::Array(payload)
}

/// Payload of the editor's `outputMonitorUpdate` event.
pub fn output_monitor_update(state: &AppState) -> Value {
    json!(state.engine.monitor.read())
}
