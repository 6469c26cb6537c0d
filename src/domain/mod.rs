//! Domain layer - core types, errors and collaborator contracts.
//!
//! This layer contains pure domain models and trait definitions
//! without any concrete I/O.

pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use models::{
    Conversation, ExportData, Folder, FolderType, Identified, Message, Prompt, Role,
    CURRENT_EXPORT_VERSION, DEFAULT_CONVERSATION_NAME,
};
pub use storage::{
    AuthProvider, BackendKind, ChatStore, SelectionStore, Session, SessionProvider,
    SignInRequest, StorageContext,
};
