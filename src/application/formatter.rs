//! Terminal output for stored history.
//!
//! Supports a table view and JSON for programmatic use.

use std::collections::HashMap;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::domain::{
    AppError, BackendKind, ChatStore, Conversation, ExportData, Folder, SelectionStore, Session,
};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Compact table listing.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// Counts and selection state of a backend.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub backend: BackendKind,
    pub conversations: usize,
    pub messages: usize,
    pub folders: usize,
    pub prompts: usize,
    pub selected: Option<String>,
    pub session: Option<Session>,
}

impl StoreSummary {
    /// Gathers counts from a backend and its selection store.
    ///
    /// # Errors
    /// Returns error if any collection cannot be read.
    pub fn collect(
        store: &dyn ChatStore,
        selection: &dyn SelectionStore,
        session: Option<Session>,
    ) -> Result<Self, AppError> {
        let conversations = store.conversations()?;

        Ok(Self {
            backend: store.kind(),
            conversations: conversations.len(),
            messages: conversations.iter().map(Conversation::message_count).sum(),
            folders: store.folders()?.len(),
            prompts: store.prompts()?.len(),
            selected: selection.selected_conversation()?.map(|c| c.name),
            session,
        })
    }
}

/// Formats a table listing of conversations.
pub fn format_conversations_table(conversations: &[Conversation], folders: &[Folder]) -> String {
    let folder_names: HashMap<&str, &str> = folders
        .iter()
        .map(|f| (f.id.as_str(), f.name.as_str()))
        .collect();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Folder", "Msgs", "Name"]);

    for conv in conversations {
        let folder = conv
            .folder_id
            .as_deref()
            .and_then(|id| folder_names.get(id).copied())
            .unwrap_or("-");

        table.add_row(vec![
            truncate(&conv.id, 12),
            truncate(folder, 18),
            conv.message_count().to_string(),
            truncate(&conv.name, 40),
        ]);
    }

    table.to_string()
}

/// Formats conversations as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_conversations_json(
    conversations: &[Conversation],
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(conversations)
}

/// Formats the outcome of an import for display.
pub fn format_import_summary(data: &ExportData) -> String {
    format!(
        "{} Imported into {} conversations, {} folders, {} prompts",
        "✓".green().bold(),
        data.history.len().to_string().cyan(),
        data.folders.len().to_string().cyan(),
        data.prompts.len().to_string().cyan()
    )
}

/// Formats backend status for display.
pub fn format_status(summary: &StoreSummary, show_session: bool) -> String {
    let mut out = format!(
        "{}\n  Backend: {}\n  Conversations: {}\n  Messages: {}\n  Folders: {}\n  Prompts: {}\n  Selected: {}",
        "📊 Status".bold(),
        summary.backend.to_string().yellow(),
        summary.conversations.to_string().cyan(),
        summary.messages.to_string().cyan(),
        summary.folders.to_string().green(),
        summary.prompts.to_string().blue(),
        summary.selected.as_deref().unwrap_or("-")
    );

    if show_session {
        let session = summary.session.as_ref().map_or_else(
            || "not signed in".dimmed().to_string(),
            |s| format!("{} ({})", s.user, s.provider),
        );
        out.push_str(&format!("\n  Session: {session}"));
    }

    out
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{cut}...")
    }
}
