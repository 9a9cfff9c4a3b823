pub mod audio;
pub mod cli;
pub mod commands;
pub mod config;
pub mod scripting;
pub mod state;

pub use cli::run;
