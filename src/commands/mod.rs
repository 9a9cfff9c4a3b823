/// `commands/` — control-thread operations used by the editor front-end
///
/// Thin handlers over `AppState`. None of them touch the Lua VM directly.
pub mod monitor_commands;
pub mod resource_commands;
pub mod script_commands;
