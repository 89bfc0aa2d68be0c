//! # Configuration Loading
//!
//! Reads [`EngineConfig`] from an optional TOML file. Missing keys keep their
//! defaults; unknown keys are rejected.

use pathwise_core::{EngineConfig, PathwiseError};
use std::path::Path;

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Load the effective configuration.
///
/// With no path the defaults are returned unchanged.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, PathwiseError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let contents = read_bounded(path, MAX_CONFIG_FILE_SIZE)?;
    let config: EngineConfig = toml::from_str(&contents).map_err(|e| {
        PathwiseError::InvalidInput(format!("Invalid config '{}': {}", path.display(), e))
    })?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Render a configuration as TOML.
pub fn render_config(config: &EngineConfig) -> Result<String, PathwiseError> {
    toml::to_string(config)
        .map_err(|e| PathwiseError::InvalidInput(format!("Cannot render config: {}", e)))
}

/// Read a UTF-8 file after checking it is a regular file no larger than `max_size`.
pub(crate) fn read_bounded(path: &Path, max_size: u64) -> Result<String, PathwiseError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        PathwiseError::InvalidInput(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(PathwiseError::InvalidInput(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(PathwiseError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    std::fs::read_to_string(path)
        .map_err(|e| PathwiseError::InvalidInput(format!("Read '{}': {}", path.display(), e)))
}
