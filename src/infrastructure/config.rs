//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Chat Archive Configuration
# Auto-generated - edit as needed

[storage]
# Backend holding folders, conversations and prompts: "local" or "relational"
backend = "local"

[paths]
# Custom data directory (optional, defaults to ~/.chat-archive)
# data_dir = "/custom/path"

[auth]
# Enable login/logout commands
enabled = false

[import]
# Write the merged prompt list on import instead of only the imported prompts
persist_merged_prompts = false
"#;

/// Load configuration from the default location, or defaults if absent.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config() -> Result<AppConfig> {
    let config_path = config_file_path();

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the default configuration file at `path` if it doesn't exist.
///
/// Returns whether a file was written.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %path.display(), "Created default configuration");

    Ok(true)
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    AppConfig::default_data_dir().join("config.toml")
}
