//! Application configuration model.
//!
//! Every section has defaults, so a partial or missing config file still
//! yields a usable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::storage::BackendKind;

/// Storage backend selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend serving folders, conversations and prompts.
    #[serde(default)]
    pub backend: BackendKind,
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Authentication switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether login/logout are available.
    #[serde(default)]
    pub enabled: bool,
}

/// Import behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Persist the merged prompt list instead of only the incoming prompts.
    #[serde(default)]
    pub persist_merged_prompts: bool,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chat-archive")
    }

    /// Path of the browser-local style JSON store.
    #[must_use]
    pub fn local_storage_path(&self) -> PathBuf {
        self.data_dir().join("local_storage.json")
    }

    /// Path of the relational database.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("chat.db")
    }

    /// Path of the persisted session.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.data_dir().join("session.toml")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }

    /// Get the exports directory path.
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir().join("exports")
    }
}
