/// `commands/script_commands.rs` — script submission and output observation
use crate::state::AppState;

/// Submit `script` for compilation. It is compiled on the audio thread at the
/// next block boundary; a newer submission before then replaces this one.
pub fn compile(state: &AppState, script: String) -> Result<(), String> {
    log::debug!("Compile requested ({} bytes)", script.len());
    state.engine.request_compile(script);
    Ok(())
}

/// Current value of the output parameter, in [-1.0, 1.0].
pub fn get_output(state: &AppState) -> Result<f32, String> {
    Ok(state.engine.output.value())
}
