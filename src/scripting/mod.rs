/// `scripting/` — Lua scripting engine
///
/// One Lua VM per `ScriptEngine`, holding at most one compiled chunk.
/// Script errors are returned as strings and never crash the audio engine.
pub mod api;
pub mod engine;
pub mod output_log;
