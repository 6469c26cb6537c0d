//! Domain-level error types for chat-archive.
//!
//! All errors are typed with `thiserror`. Storage failures are propagated
//! unchanged to the caller; nothing here retries or rolls back.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input could not be classified as any supported export format.
    #[error("Unsupported data format: {message}")]
    UnsupportedFormat { message: String },

    /// A storage backend operation failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Writing the Markdown archive failed.
    #[error("Archive error: {message}")]
    Archive {
        message: String,
        #[source]
        source: Option<zip::result::ZipError>,
    },

    /// Session could not be read or written.
    #[error("Session error: {message}")]
    Session { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create an unsupported-format error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    /// Create a storage error with a plain message.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an archive error with context.
    pub fn archive(message: impl Into<String>, err: zip::result::ZipError) -> Self {
        Self::Archive {
            message: format!("{}: {err}", message.into()),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
