//! Settings loading

use anyhow::{Context, Result};
use imgdl_types::Settings;
use std::path::Path;

/// Load settings from a JSON file, or defaults when no file is given.
///
/// Missing fields in the file keep their default values.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let settings = serde_json::from_str(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded settings");
    Ok(settings)
}
