//! Export of stored history as canonical JSON or a Markdown archive.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::{AppError, ChatStore, Conversation, ExportData, Folder, FolderType, Result};

/// Kind of export artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Canonical JSON payload.
    Data,
    /// ZIP archive of Markdown files.
    Markdown,
}

impl ExportKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Markdown => "markdown",
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            Self::Data => "json",
            Self::Markdown => "zip",
        }
    }
}

/// File name of an export created on `date`.
///
/// Format: `chatbot_ui_export_<YYYYMMDD>_<kind>.<ext>`
#[must_use]
pub fn export_filename(kind: ExportKind, date: NaiveDate) -> String {
    format!(
        "chatbot_ui_export_{}_{}.{}",
        date.format("%Y%m%d"),
        kind.label(),
        kind.extension()
    )
}

/// Reads the current collections of a backend as a canonical payload.
///
/// # Errors
/// Returns error if any collection cannot be read.
pub fn export_data(store: &dyn ChatStore) -> Result<ExportData> {
    let history = store.conversations()?;
    let folders = store.folders()?;
    let prompts = store.prompts()?;

    Ok(ExportData::new(history, folders, prompts))
}

/// Renders the messages of a conversation as Markdown.
#[must_use]
pub fn render_markdown(conversation: &Conversation) -> String {
    let mut out = String::new();
    for message in &conversation.messages {
        out.push_str(&format!("## {}\n\n{}\n\n", message.role, message.content));
    }
    out
}

/// Builds a ZIP archive with one Markdown file per conversation.
///
/// Chat folders become directories and conversations filed under one are
/// placed inside it. When two entries share a path the later one wins.
///
/// # Errors
/// Returns error if the archive cannot be written.
pub fn build_markdown_archive(conversations: &[Conversation], folders: &[Folder]) -> Result<Vec<u8>> {
    let chat_folders: Vec<&Folder> = folders
        .iter()
        .filter(|f| f.folder_type == FolderType::Chat)
        .collect();

    let folder_names: HashMap<&str, &str> = chat_folders
        .iter()
        .map(|f| (f.id.as_str(), f.name.as_str()))
        .collect();

    let mut entries: Vec<(String, Option<String>)> = Vec::new();
    let mut upsert = |path: String, content: Option<String>| {
        match entries.iter_mut().find(|(existing, _)| *existing == path) {
            Some(entry) => entry.1 = content,
            None => entries.push((path, content)),
        }
    };

    for folder in &chat_folders {
        upsert(format!("{}/", folder.name), None);
    }

    for conversation in conversations {
        let directory = conversation
            .folder_id
            .as_deref()
            .and_then(|id| folder_names.get(id))
            .map_or_else(String::new, |name| format!("{name}/"));

        upsert(
            format!("{directory}{}.md", conversation.name),
            Some(render_markdown(conversation)),
        );
    }

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, content) in entries {
            match content {
                None => zip
                    .add_directory(path.as_str(), options)
                    .map_err(|e| AppError::archive(format!("Failed to add directory {path}"), e))?,
                Some(markdown) => {
                    zip.start_file(path.as_str(), options)
                        .map_err(|e| AppError::archive(format!("Failed to add {path}"), e))?;
                    zip.write_all(markdown.as_bytes())
                        .map_err(|e| AppError::io(format!("Failed to write {path}"), e))?;
                }
            }
        }

        zip.finish()
            .map_err(|e| AppError::archive("Failed to finalize archive", e))?;
    }

    Ok(cursor.into_inner())
}

/// Writes the canonical JSON export into `dir`.
///
/// # Errors
/// Returns error if storage cannot be read or the file cannot be written.
pub fn write_data_export(store: &dyn ChatStore, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    let data = export_data(store)?;
    let content = serde_json::to_string_pretty(&data).map_err(AppError::json_parse)?;
    let path = write_export(dir, export_filename(ExportKind::Data, date), content.as_bytes())?;

    tracing::info!(
        path = %path.display(),
        conversations = data.history.len(),
        folders = data.folders.len(),
        prompts = data.prompts.len(),
        "Data export written"
    );

    Ok(path)
}

/// Writes the Markdown archive export into `dir`.
///
/// # Errors
/// Returns error if storage cannot be read or the archive cannot be written.
pub fn write_markdown_export(store: &dyn ChatStore, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    let conversations = store.conversations()?;
    let folders = store.folders()?;
    let archive = build_markdown_archive(&conversations, &folders)?;
    let path = write_export(dir, export_filename(ExportKind::Markdown, date), &archive)?;

    tracing::info!(
        path = %path.display(),
        conversations = conversations.len(),
        bytes = archive.len(),
        "Markdown export written"
    );

    Ok(path)
}

fn write_export(dir: &Path, filename: String, content: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create directory {}", dir.display()), e))?;

    let path = dir.join(filename);
    std::fs::write(&path, content)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::tempdir;
    use zip::ZipArchive;

    use super::*;
    use crate::domain::{Message, Role};

    fn trip() -> Conversation {
        Conversation::new("t", "Trip").with_messages(vec![
            Message::new(Role::User, "Where?"),
            Message::new(Role::Assistant, "Paris"),
        ])
    }

    fn read_entry(archive: &[u8], name: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = zip.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn entry_names(archive: &[u8]) -> Vec<String> {
        let zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            export_filename(ExportKind::Data, date),
            "chatbot_ui_export_20240307_data.json"
        );
        assert_eq!(
            export_filename(ExportKind::Markdown, date),
            "chatbot_ui_export_20240307_markdown.zip"
        );
    }

    #[test]
    fn test_render_markdown() {
        assert_eq!(
            render_markdown(&trip()),
            "## User\n\nWhere?\n\n## Assistant\n\nParis\n\n"
        );
    }

    #[test]
    fn test_archive_places_unfiled_conversation_at_root() {
        let archive = build_markdown_archive(&[trip()], &[]).unwrap();

        assert_eq!(entry_names(&archive), vec!["Trip.md"]);
        assert_eq!(
            read_entry(&archive, "Trip.md"),
            "## User\n\nWhere?\n\n## Assistant\n\nParis\n\n"
        );
    }

    #[test]
    fn test_archive_uses_chat_folders_as_directories() {
        let folders = vec![
            Folder::new("f1", "Travel", FolderType::Chat),
            Folder::new("p1", "Snippets", FolderType::Prompt),
        ];
        let filed = trip().in_folder("f1");
        let prompt_filed = Conversation::new("x", "Odd").in_folder("p1");

        let archive = build_markdown_archive(&[filed, prompt_filed], &folders).unwrap();

        assert_eq!(
            entry_names(&archive),
            vec!["Odd.md", "Travel/", "Travel/Trip.md"]
        );
    }

    #[test]
    fn test_archive_later_entry_wins_on_same_path() {
        let first = Conversation::new("1", "Same")
            .with_messages(vec![Message::new(Role::User, "first")]);
        let second = Conversation::new("2", "Same")
            .with_messages(vec![Message::new(Role::User, "second")]);

        let archive = build_markdown_archive(&[first, second], &[]).unwrap();

        assert_eq!(entry_names(&archive), vec!["Same.md"]);
        assert_eq!(read_entry(&archive, "Same.md"), "## User\n\nsecond\n\n");
    }

    #[test]
    fn test_write_export_creates_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/exports");

        let path = write_export(&target, "out.json".to_string(), b"{}").unwrap();

        assert_eq!(path, target.join("out.json"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn test_data_export_file_reparses_to_stored_state() {
        use crate::application::migration::{clean_data, SupportedExport};
        use crate::domain::Prompt;
        use crate::infrastructure::LocalStorage;

        let dir = tempdir().unwrap();
        let mut store = LocalStorage::open(&dir.path().join("local.json"));
        store
            .update_folders(&[Folder::new("f1", "Travel", FolderType::Chat)])
            .unwrap();
        store.update_conversations(&[trip().in_folder("f1")]).unwrap();
        store
            .update_prompts(&[Prompt::new("p").with_field("content", "Summarize")])
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let path = write_data_export(&store, &dir.path().join("exports"), date).unwrap();

        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("chatbot_ui_export_20240307_data.json")
        );

        let text = std::fs::read_to_string(&path).unwrap();
        let reparsed = clean_data(SupportedExport::from_json(&text).unwrap());
        assert_eq!(reparsed, export_data(&store).unwrap());
        assert_eq!(reparsed.history[0].messages.len(), 2);
    }
}
