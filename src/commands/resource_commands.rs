/// `commands/resource_commands.rs` — static files for the editor front-end
use std::path::{Component, Path, PathBuf};

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

/// Load `name` (e.g. `/index.html`) from the assets directory.
pub fn fetch_resource(state: &AppState, name: &str) -> Result<Resource, String> {
    let path = resolve(&state.assets_dir, name)
        .filter(|p| p.is_file())
        .ok_or_else(|| format!("Resource not found: {name}"))?;

    let data = std::fs::read(&path).map_err(|e| format!("Failed to read {name}: {e}"))?;
    Ok(Resource {
        data,
        mime_type: mime_type_for(&path),
    })
}

pub fn mime_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        _ => "text/plain",
    }
}

/// Map a resource name onto a path under `root`. Names that try to leave
/// `root` resolve to nothing.
fn resolve(root: &Path, name: &str) -> Option<PathBuf> {
    let relative = match name.trim_start_matches('/') {
        "" => "index.html",
        rest => rest,
    };
    let relative = Path::new(relative);
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(relative))
}
