use std::{path::PathBuf, sync::Arc};

use crate::audio::engine::EngineShared;

/// Control-side application state — shared by every command handler.
///
/// Holds no interpreter state: the Lua VM belongs to the audio thread and is
/// only reached through the compile slot and telemetry rings in `engine`.
pub struct AppState {
    pub engine: Arc<EngineShared>,
    /// Root directory the front-end's static resources are served from.
    pub assets_dir: PathBuf,
}

impl AppState {
    pub fn new(engine: Arc<EngineShared>) -> Self {
        Self {
            engine,
            assets_dir: PathBuf::from("dist"),
        }
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }
}
