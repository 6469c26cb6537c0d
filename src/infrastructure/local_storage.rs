//! Browser-local style storage backed by a single JSON document.
//!
//! The document is a flat object of keys to JSON values, mirroring the
//! `localStorage` keys the web frontend used. Every operation reads the file
//! afresh, so several handles on the same path observe each other's writes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{
    AppError, BackendKind, ChatStore, Conversation, Folder, Prompt, Result, SelectionStore,
};

const FOLDERS_KEY: &str = "folders";
const CONVERSATIONS_KEY: &str = "conversationHistory";
const PROMPTS_KEY: &str = "prompts";
const SELECTED_KEY: &str = "selectedConversation";

/// Key/value JSON document store.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Opens the store at `path`. The file is created on first write.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::io(format!("Failed to read {}", self.path.display()), e)
        })?;

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content).map_err(AppError::json_parse)? {
            Value::Object(document) => Ok(document),
            _ => Err(AppError::storage(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let content = serde_json::to_string_pretty(document).map_err(AppError::json_parse)?;
        fs::write(&self.path, content)
            .map_err(|e| AppError::io(format!("Failed to write {}", self.path.display()), e))
    }

    /// Reads and decodes a key, treating a missing or null key as absent.
    fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_document()?.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                AppError::storage(format!("Invalid value stored under '{key}': {e}"))
            }),
        }
    }

    fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(AppError::json_parse)?;
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value);
        self.write_document(&document)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut document = self.read_document()?;
        if document.remove(key).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

impl ChatStore for LocalStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn folders(&self) -> Result<Vec<Folder>> {
        Ok(self.get_item(FOLDERS_KEY)?.unwrap_or_default())
    }

    fn update_folders(&mut self, folders: &[Folder]) -> Result<()> {
        self.set_item(FOLDERS_KEY, folders)
    }

    fn conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.get_item(CONVERSATIONS_KEY)?.unwrap_or_default())
    }

    fn update_conversations(&mut self, conversations: &[Conversation]) -> Result<()> {
        self.set_item(CONVERSATIONS_KEY, conversations)
    }

    fn prompts(&self) -> Result<Vec<Prompt>> {
        Ok(self.get_item(PROMPTS_KEY)?.unwrap_or_default())
    }

    fn update_prompts(&mut self, prompts: &[Prompt]) -> Result<()> {
        self.set_item(PROMPTS_KEY, prompts)
    }
}

impl SelectionStore for LocalStorage {
    fn selected_conversation(&self) -> Result<Option<Conversation>> {
        self.get_item(SELECTED_KEY)
    }

    fn save_selected_conversation(&mut self, conversation: &Conversation) -> Result<()> {
        self.set_item(SELECTED_KEY, conversation)
    }

    fn delete_selected_conversation(&mut self) -> Result<()> {
        self.remove_item(SELECTED_KEY)
    }
}
