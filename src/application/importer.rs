//! Import service: merges an export payload into the configured backend.
//!
//! Each collection is read, merged and written back on its own, in the
//! order folders, conversations, prompts. A failure part-way leaves the
//! collections already written in place.

use std::collections::HashSet;

use crate::domain::{
    BackendKind, Conversation, ExportData, Folder, FolderType, Identified, Result,
    StorageContext,
};

use super::migration::{clean_data, SupportedExport};

/// Options for an import.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Write the merged prompt list back instead of only the incoming one.
    pub persist_merged_prompts: bool,
}

/// Concatenates `existing` and `incoming` and drops later duplicates by id.
///
/// On an id collision the existing entry is kept.
pub fn merge_by_id<T: Identified>(existing: Vec<T>, incoming: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    existing
        .into_iter()
        .chain(incoming)
        .filter(|item| seen.insert(item.id().to_string()))
        .collect()
}

/// Imports a payload of any supported format into storage.
///
/// Returns the merged canonical state.
///
/// # Errors
/// Propagates the first storage failure unchanged.
pub fn import_data(
    ctx: &mut StorageContext<'_>,
    data: SupportedExport,
    options: ImportOptions,
) -> Result<ExportData> {
    let source_version = data.version();
    let ExportData {
        history,
        folders,
        prompts,
        ..
    } = clean_data(data);

    let incoming_folders = folders.len();
    let old_folders = ctx.store.folders()?;
    let new_folders = merge_by_id(old_folders, folders);
    tracing::debug!(
        incoming = incoming_folders,
        merged = new_folders.len(),
        "Merged folders"
    );
    ctx.store.update_folders(&new_folders)?;

    let old_conversations = ctx.store.conversations()?;
    let new_history = merge_by_id(old_conversations, history.clone());
    tracing::debug!(
        incoming = history.len(),
        merged = new_history.len(),
        "Merged conversations"
    );
    ctx.store.update_conversations(&new_history)?;

    if ctx.store.kind() == BackendKind::Relational {
        for conversation in history.iter().filter(|c| !c.messages.is_empty()) {
            ctx.store
                .create_messages(conversation, &conversation.messages, &new_history)?;
        }
    }

    select_last(ctx, &new_history)?;

    let old_prompts = ctx.store.prompts()?;
    let new_prompts = merge_by_id(old_prompts, prompts.clone());
    if options.persist_merged_prompts {
        ctx.store.update_prompts(&new_prompts)?;
    } else {
        ctx.store.update_prompts(&prompts)?;
    }

    tracing::info!(
        format = %source_version,
        backend = %ctx.store.kind(),
        conversations = new_history.len(),
        folders = new_folders.len(),
        prompts = new_prompts.len(),
        "Import completed"
    );

    Ok(ExportData::new(new_history, new_folders, new_prompts))
}

/// Removes every conversation and chat folder and clears the selection.
///
/// Prompt folders are kept.
///
/// # Errors
/// Propagates the first storage failure unchanged.
pub fn clear_conversations(ctx: &mut StorageContext<'_>) -> Result<()> {
    ctx.store.update_conversations(&[])?;
    ctx.selection.delete_selected_conversation()?;

    let folders: Vec<Folder> = ctx
        .store
        .folders()?
        .into_iter()
        .filter(|f| f.folder_type != FolderType::Chat)
        .collect();
    ctx.store.update_folders(&folders)?;

    tracing::info!(remaining_folders = folders.len(), "Cleared conversations");
    Ok(())
}

fn select_last(ctx: &mut StorageContext<'_>, history: &[Conversation]) -> Result<()> {
    match history.last() {
        Some(conversation) => ctx.selection.save_selected_conversation(conversation),
        None => ctx.selection.delete_selected_conversation(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{
        AppError, ChatStore, Message, Prompt, Role, SelectionStore,
    };

    /// In-memory backend recording the calls it receives.
    #[derive(Default)]
    struct MemoryStore {
        kind: BackendKind,
        folders: Vec<Folder>,
        conversations: Vec<Conversation>,
        prompts: Vec<Prompt>,
        created_messages: Vec<(String, usize)>,
        fail_on_conversation_update: bool,
    }

    impl ChatStore for MemoryStore {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn folders(&self) -> Result<Vec<Folder>> {
            Ok(self.folders.clone())
        }

        fn update_folders(&mut self, folders: &[Folder]) -> Result<()> {
            self.folders = folders.to_vec();
            Ok(())
        }

        fn conversations(&self) -> Result<Vec<Conversation>> {
            Ok(self.conversations.clone())
        }

        fn update_conversations(&mut self, conversations: &[Conversation]) -> Result<()> {
            if self.fail_on_conversation_update {
                return Err(AppError::storage("conversations unavailable"));
            }
            self.conversations = conversations.to_vec();
            Ok(())
        }

        fn prompts(&self) -> Result<Vec<Prompt>> {
            Ok(self.prompts.clone())
        }

        fn update_prompts(&mut self, prompts: &[Prompt]) -> Result<()> {
            self.prompts = prompts.to_vec();
            Ok(())
        }

        fn create_messages(
            &mut self,
            conversation: &Conversation,
            messages: &[Message],
            _history: &[Conversation],
        ) -> Result<()> {
            self.created_messages
                .push((conversation.id.clone(), messages.len()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySelection {
        selected: Option<Conversation>,
        cleared: bool,
    }

    impl SelectionStore for MemorySelection {
        fn selected_conversation(&self) -> Result<Option<Conversation>> {
            Ok(self.selected.clone())
        }

        fn save_selected_conversation(&mut self, conversation: &Conversation) -> Result<()> {
            self.selected = Some(conversation.clone());
            Ok(())
        }

        fn delete_selected_conversation(&mut self) -> Result<()> {
            self.selected = None;
            self.cleared = true;
            Ok(())
        }
    }

    fn chat(id: &str, name: &str) -> Conversation {
        Conversation::new(id, name).with_messages(vec![Message::new(Role::User, name)])
    }

    fn run_import(
        store: &mut MemoryStore,
        selection: &mut MemorySelection,
        data: SupportedExport,
        options: ImportOptions,
    ) -> Result<ExportData> {
        let mut ctx = StorageContext::new(store, selection);
        import_data(&mut ctx, data, options)
    }

    #[test]
    fn test_merge_by_id_keeps_existing_on_collision() {
        let existing = vec![chat("1", "stored"), chat("2", "other")];
        let incoming = vec![chat("1", "incoming"), chat("3", "new")];

        let merged = merge_by_id(existing, incoming);
        let names: Vec<&str> = merged.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["stored", "other", "new"]);
    }

    #[test]
    fn test_merge_by_id_deduplicates_within_existing() {
        let merged = merge_by_id(vec![chat("1", "a"), chat("1", "b")], Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "a");
    }

    #[test]
    fn test_import_keeps_stored_conversation_on_collision() {
        let mut store = MemoryStore {
            conversations: vec![chat("1", "stored")],
            ..Default::default()
        };
        let mut selection = MemorySelection::default();

        let data = ExportData::new(vec![chat("1", "incoming"), chat("2", "new")], vec![], vec![]);
        let merged = run_import(&mut store, &mut selection, data.into(), ImportOptions::default())
            .unwrap();

        assert_eq!(merged.history.len(), 2);
        assert_eq!(merged.history[0].name, "stored");
        assert_eq!(store.conversations, merged.history);
    }

    #[test]
    fn test_import_twice_does_not_duplicate() {
        let mut store = MemoryStore::default();
        let mut selection = MemorySelection::default();
        let data = ExportData::new(
            vec![chat("1", "a")],
            vec![Folder::new("f", "Work", FolderType::Chat)],
            vec![Prompt::new("p")],
        );

        run_import(&mut store, &mut selection, data.clone().into(), ImportOptions::default())
            .unwrap();
        let second =
            run_import(&mut store, &mut selection, data.into(), ImportOptions::default()).unwrap();

        assert_eq!(second.history.len(), 1);
        assert_eq!(second.folders.len(), 1);
        assert_eq!(second.prompts.len(), 1);
    }

    #[test]
    fn test_import_selects_last_merged_conversation() {
        let mut store = MemoryStore {
            conversations: vec![chat("old", "old")],
            ..Default::default()
        };
        let mut selection = MemorySelection::default();

        let data = SupportedExport::from_value(json!([{"id": "new", "name": "new"}])).unwrap();
        run_import(&mut store, &mut selection, data, ImportOptions::default()).unwrap();

        assert_eq!(selection.selected.map(|c| c.id), Some("new".to_string()));
    }

    #[test]
    fn test_import_of_empty_history_clears_selection() {
        let mut store = MemoryStore::default();
        let mut selection = MemorySelection {
            selected: Some(chat("gone", "gone")),
            cleared: false,
        };

        run_import(
            &mut store,
            &mut selection,
            ExportData::default().into(),
            ImportOptions::default(),
        )
        .unwrap();

        assert!(selection.cleared);
        assert!(selection.selected.is_none());
    }

    #[test]
    fn test_relational_backend_materializes_incoming_messages() {
        let mut store = MemoryStore {
            kind: BackendKind::Relational,
            conversations: vec![chat("1", "stored")],
            ..Default::default()
        };
        let mut selection = MemorySelection::default();

        let data = ExportData::new(
            vec![chat("1", "dup"), Conversation::new("2", "empty"), chat("3", "fresh")],
            vec![],
            vec![],
        );
        run_import(&mut store, &mut selection, data.into(), ImportOptions::default()).unwrap();

        assert_eq!(
            store.created_messages,
            vec![("1".to_string(), 1), ("3".to_string(), 1)]
        );
    }

    #[test]
    fn test_local_backend_does_not_materialize_messages() {
        let mut store = MemoryStore::default();
        let mut selection = MemorySelection::default();

        let data = ExportData::new(vec![chat("1", "a")], vec![], vec![]);
        run_import(&mut store, &mut selection, data.into(), ImportOptions::default()).unwrap();

        assert!(store.created_messages.is_empty());
    }

    #[test]
    fn test_prompts_persist_incoming_only_by_default() {
        let mut store = MemoryStore {
            prompts: vec![Prompt::new("stored")],
            ..Default::default()
        };
        let mut selection = MemorySelection::default();

        let data = ExportData::new(vec![], vec![], vec![Prompt::new("incoming")]);
        let merged =
            run_import(&mut store, &mut selection, data.into(), ImportOptions::default()).unwrap();

        let returned: Vec<&str> = merged.prompts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(returned, vec!["stored", "incoming"]);
        assert_eq!(store.prompts, vec![Prompt::new("incoming")]);
    }

    #[test]
    fn test_prompts_persist_merged_when_configured() {
        let mut store = MemoryStore {
            prompts: vec![Prompt::new("stored")],
            ..Default::default()
        };
        let mut selection = MemorySelection::default();

        let data = ExportData::new(vec![], vec![], vec![Prompt::new("incoming")]);
        let options = ImportOptions {
            persist_merged_prompts: true,
        };
        let merged = run_import(&mut store, &mut selection, data.into(), options).unwrap();

        assert_eq!(store.prompts, merged.prompts);
    }

    #[test]
    fn test_storage_failure_propagates_after_partial_write() {
        let mut store = MemoryStore {
            fail_on_conversation_update: true,
            ..Default::default()
        };
        let mut selection = MemorySelection::default();

        let data = ExportData::new(
            vec![chat("1", "a")],
            vec![Folder::new("f", "Work", FolderType::Chat)],
            vec![],
        );
        let result = run_import(&mut store, &mut selection, data.into(), ImportOptions::default());

        assert!(matches!(result, Err(AppError::Storage { .. })));
        assert_eq!(store.folders.len(), 1);
        assert!(store.conversations.is_empty());
        assert!(selection.selected.is_none());
    }

    #[test]
    fn test_v2_import_files_folders_as_chat() {
        let mut store = MemoryStore::default();
        let mut selection = MemorySelection::default();

        let data = SupportedExport::from_value(json!({
            "history": [{"id": 1, "name": "A", "folderId": 9}],
            "folders": [{"id": 9, "name": "Legacy"}]
        }))
        .unwrap();
        run_import(&mut store, &mut selection, data, ImportOptions::default()).unwrap();

        assert_eq!(store.folders, vec![Folder::new("9", "Legacy", FolderType::Chat)]);
        assert_eq!(store.conversations[0].folder_id.as_deref(), Some("9"));
    }

    #[test]
    fn test_clear_conversations_keeps_prompt_folders() {
        let mut store = MemoryStore {
            conversations: vec![chat("1", "a")],
            folders: vec![
                Folder::new("c", "Chats", FolderType::Chat),
                Folder::new("p", "Prompts", FolderType::Prompt),
            ],
            ..Default::default()
        };
        let mut selection = MemorySelection {
            selected: Some(chat("1", "a")),
            cleared: false,
        };

        {
            let mut ctx = StorageContext::new(&mut store, &mut selection);
            clear_conversations(&mut ctx).unwrap();
        }

        assert!(store.conversations.is_empty());
        assert_eq!(store.folders, vec![Folder::new("p", "Prompts", FolderType::Prompt)]);
        assert!(selection.selected.is_none());
    }

    #[test]
    fn test_sqlite_import_persists_what_it_returns() {
        use crate::infrastructure::{LocalStorage, SqliteStorage};

        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let mut selection = LocalStorage::open(&dir.path().join("local.json"));

        let stored = Conversation::new("1", "stored")
            .with_messages(vec![Message::new(Role::User, "stored message")]);
        let incoming = Conversation::new("1", "incoming")
            .with_messages(vec![Message::new(Role::User, "incoming message")]);
        let fresh = chat("2", "fresh");

        let mut ctx = StorageContext::new(&mut store, &mut selection);
        import_data(
            &mut ctx,
            ExportData::new(vec![stored.clone()], vec![], vec![]).into(),
            ImportOptions::default(),
        )
        .unwrap();
        let merged = import_data(
            &mut ctx,
            ExportData::new(vec![incoming, fresh.clone()], vec![], vec![]).into(),
            ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(merged.history, vec![stored, fresh.clone()]);
        assert_eq!(store.conversations().unwrap(), merged.history);
        assert_eq!(selection.selected_conversation().unwrap(), Some(fresh));
    }
}
