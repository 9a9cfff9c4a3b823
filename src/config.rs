use std::path::Path;

use serde::{Deserialize, Serialize};

/// Settings for the standalone host binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Output device to open; `None` uses the system default.
    pub device_name: Option<String>,
    /// Extra directory searched by `require`.
    pub package_path: Option<String>,
    /// Root of the editor front-end's static files.
    pub assets_dir: String,
    /// How often the script file is checked for changes.
    pub poll_interval_ms: u64,
    /// How often telemetry is written to the log.
    pub report_interval_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            package_path: None,
            assets_dir: "dist".to_string(),
            poll_interval_ms: 20,
            report_interval_ms: 1000,
        }
    }
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("Invalid config {}: {e}", path.display()))
    }
}
