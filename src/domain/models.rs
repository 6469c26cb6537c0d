//! Domain models for chat history.
//!
//! These are the canonical entities stored by a backend and carried inside
//! an export payload. Fields the model does not name are preserved in
//! `extra` so that a round trip through the tool does not lose data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version number of the canonical export format.
pub const CURRENT_EXPORT_VERSION: u32 = 4;

/// Name given to a conversation that arrives without one.
pub const DEFAULT_CONVERSATION_NAME: &str = "New Conversation";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user.
    User,
    /// Reply produced by the assistant.
    Assistant,
    /// System prompt.
    System,
}

impl Role {
    /// Lowercase wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Assistant => write!(f, "Assistant"),
            Self::System => write!(f, "System"),
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A conversation and its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier for this conversation.
    pub id: String,
    /// Display name, also used as the Markdown file name.
    pub name: String,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Folder this conversation is filed under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// Fields not modelled explicitly (model, prompt, temperature...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            messages: Vec::new(),
            folder_id: None,
            extra: Map::new(),
        }
    }

    /// Attach messages.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// File the conversation under a folder.
    #[must_use]
    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// Get total message count.
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Kind of items a folder groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Chat,
    Prompt,
}

impl FolderType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Prompt => "prompt",
        }
    }
}

impl std::str::FromStr for FolderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "prompt" => Ok(Self::Prompt),
            _ => Err(format!("Unknown folder type: {s}")),
        }
    }
}

/// A folder of conversations or prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub folder_type: FolderType,
}

impl Folder {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, folder_type: FolderType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            folder_type,
        }
    }
}

/// A saved prompt. Only the identifier is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Prompt {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Set an arbitrary field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Entities deduplicated by identifier during a merge.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Conversation {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Folder {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Prompt {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The canonical (version 4) export payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    pub version: u32,
    #[serde(default)]
    pub history: Vec<Conversation>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
}

impl ExportData {
    /// Build a canonical payload from its collections.
    #[must_use]
    pub const fn new(history: Vec<Conversation>, folders: Vec<Folder>, prompts: Vec<Prompt>) -> Self {
        Self {
            version: CURRENT_EXPORT_VERSION,
            history,
            folders,
            prompts,
        }
    }
}

impl Default for ExportData {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_is_capitalized() {
        assert_eq!(Role::User.to_string(), "User");
        assert_eq!(Role::Assistant.to_string(), "Assistant");
        assert_eq!(Role::System.to_string(), "System");
    }

    #[test]
    fn test_folder_type_serializes_as_type_field() {
        let folder = Folder::new("f1", "Work", FolderType::Chat);
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["type"], "chat");
        assert!(json.get("folder_type").is_none());
    }

    #[test]
    fn test_conversation_keeps_unknown_fields() {
        let json = serde_json::json!({
            "id": "c1",
            "name": "Chat",
            "messages": [],
            "folderId": "f1",
            "temperature": 0.7
        });
        let conv: Conversation = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(conv.folder_id.as_deref(), Some("f1"));
        assert_eq!(conv.extra["temperature"], 0.7);
        assert_eq!(serde_json::to_value(&conv).unwrap(), json);
    }

    #[test]
    fn test_conversation_without_folder_omits_folder_id() {
        let conv = Conversation::new("c1", "Chat");
        let json = serde_json::to_value(&conv).unwrap();
        assert!(json.get("folderId").is_none());
    }

    #[test]
    fn test_prompt_is_opaque() {
        let json = serde_json::json!({"id": "p1", "name": "Summarize", "content": "..."});
        let prompt: Prompt = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(prompt.id, "p1");
        assert_eq!(serde_json::to_value(&prompt).unwrap(), json);
    }
}
