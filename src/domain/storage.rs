//! Collaborator contracts consumed by the import/export services.
//!
//! Backends are passed in explicitly through a [`StorageContext`]; nothing
//! in the application layer reaches for global state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::models::{Conversation, Folder, Message, Prompt};

/// Which storage implementation serves a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Browser-local style key/value document.
    #[default]
    Local,
    /// Relational database.
    Relational,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "localstorage" => Ok(Self::Local),
            "relational" | "rdbms" | "sqlite" => Ok(Self::Relational),
            _ => Err(format!("Unknown backend: {s}. Use: local, relational")),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Relational => write!(f, "relational"),
        }
    }
}

/// Persistent collections of folders, conversations and prompts.
///
/// Collections are always read and written whole.
pub trait ChatStore {
    /// Backend kind of this store.
    fn kind(&self) -> BackendKind;

    fn folders(&self) -> Result<Vec<Folder>>;
    fn update_folders(&mut self, folders: &[Folder]) -> Result<()>;

    fn conversations(&self) -> Result<Vec<Conversation>>;
    fn update_conversations(&mut self, conversations: &[Conversation]) -> Result<()>;

    fn prompts(&self) -> Result<Vec<Prompt>>;
    fn update_prompts(&mut self, prompts: &[Prompt]) -> Result<()>;

    /// Materialize the messages of one conversation.
    ///
    /// Only relational backends store messages apart from their
    /// conversation; the default does nothing.
    fn create_messages(
        &mut self,
        _conversation: &Conversation,
        _messages: &[Message],
        _history: &[Conversation],
    ) -> Result<()> {
        Ok(())
    }
}

/// Remembers which conversation is currently selected.
pub trait SelectionStore {
    fn selected_conversation(&self) -> Result<Option<Conversation>>;
    fn save_selected_conversation(&mut self, conversation: &Conversation) -> Result<()>;
    fn delete_selected_conversation(&mut self) -> Result<()>;
}

/// Handles the import/export services operate on.
pub struct StorageContext<'a> {
    pub store: &'a mut dyn ChatStore,
    pub selection: &'a mut dyn SelectionStore,
}

impl<'a> StorageContext<'a> {
    pub fn new(store: &'a mut dyn ChatStore, selection: &'a mut dyn SelectionStore) -> Self {
        Self { store, selection }
    }
}

/// Identity provider a session was opened with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Credentials,
    Google,
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credentials" | "email" => Ok(Self::Credentials),
            "google" => Ok(Self::Google),
            _ => Err(format!("Unknown provider: {s}. Use: credentials, google")),
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credentials => write!(f, "credentials"),
            Self::Google => write!(f, "google"),
        }
    }
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: String,
    pub provider: AuthProvider,
    pub signed_in_at: DateTime<Utc>,
}

/// Parameters for opening a session.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub user: String,
    pub provider: AuthProvider,
}

/// Session provider exposing sign-in/sign-out.
pub trait SessionProvider {
    fn current_session(&self) -> Result<Option<Session>>;
    fn sign_in(&mut self, request: SignInRequest) -> Result<Session>;
    fn sign_out(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("local".parse::<BackendKind>(), Ok(BackendKind::Local));
        assert_eq!("localStorage".parse::<BackendKind>(), Ok(BackendKind::Local));
        assert_eq!("rdbms".parse::<BackendKind>(), Ok(BackendKind::Relational));
        assert!("couchdb".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_auth_provider_from_str() {
        assert_eq!("google".parse::<AuthProvider>(), Ok(AuthProvider::Google));
        assert_eq!("email".parse::<AuthProvider>(), Ok(AuthProvider::Credentials));
        assert!("github".parse::<AuthProvider>().is_err());
    }
}
