//! File-backed session provider.
//!
//! Records who is signed in as a small TOML file; credentials are not
//! verified here.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::domain::{AppError, Result, Session, SessionProvider, SignInRequest};

/// Session persisted next to the other data files.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SessionProvider for FileSessionStore {
    fn current_session(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| AppError::io(format!("Failed to read {}", self.path.display()), e))?;

        toml::from_str(&content)
            .map(Some)
            .map_err(|e| AppError::Session {
                message: format!("Invalid session file: {e}"),
            })
    }

    fn sign_in(&mut self, request: SignInRequest) -> Result<Session> {
        let user = request.user.trim();
        if user.is_empty() {
            return Err(AppError::Session {
                message: "User must not be empty".into(),
            });
        }

        let session = Session {
            user: user.to_string(),
            provider: request.provider,
            signed_in_at: Utc::now(),
        };

        let content = toml::to_string_pretty(&session).map_err(|e| AppError::Session {
            message: format!("Failed to serialize session: {e}"),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create session directory", e))?;
        }
        fs::write(&self.path, content)
            .map_err(|e| AppError::io(format!("Failed to write {}", self.path.display()), e))?;

        tracing::info!(user = %session.user, provider = %session.provider, "Signed in");
        Ok(session)
    }

    fn sign_out(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                AppError::io(format!("Failed to remove {}", self.path.display()), e)
            })?;
            tracing::info!("Signed out");
        }
        Ok(())
    }
}
