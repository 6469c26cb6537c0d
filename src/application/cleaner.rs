//! Repair of conversation records coming from legacy exports.
//!
//! Old exports were written by several versions of the frontend and may be
//! missing fields or contain junk entries. Records that cannot be repaired
//! are dropped; everything else is coerced into a [`Conversation`].

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::{Conversation, Message, DEFAULT_CONVERSATION_NAME};

/// Sanitizes a sequence of conversation-like values.
///
/// The output has the same or fewer entries, in the original order, with
/// pairwise-unique ids (the first occurrence of an id is kept).
pub fn clean_history(entries: Vec<Value>) -> Vec<Conversation> {
    let total = entries.len();
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(total);

    for (index, entry) in entries.into_iter().enumerate() {
        match clean_conversation(entry) {
            Ok(conversation) => {
                if seen.insert(conversation.id.clone()) {
                    cleaned.push(conversation);
                } else {
                    tracing::warn!(index, id = %conversation.id, "Dropping duplicate conversation");
                }
            }
            Err(reason) => {
                tracing::warn!(index, reason, "Dropping malformed conversation");
            }
        }
    }

    if cleaned.len() < total {
        tracing::debug!(kept = cleaned.len(), total, "Cleaned conversation history");
    }

    cleaned
}

/// Repairs a single conversation record.
fn clean_conversation(entry: Value) -> Result<Conversation, &'static str> {
    let Value::Object(mut fields) = entry else {
        return Err("not an object");
    };

    let id = fields
        .remove("id")
        .as_ref()
        .and_then(identifier)
        .ok_or("missing id")?;

    let name = match fields.remove("name") {
        Some(Value::String(name)) => name,
        _ => DEFAULT_CONVERSATION_NAME.to_string(),
    };

    let messages = match fields.remove("messages") {
        Some(Value::Array(items)) => items.into_iter().filter_map(clean_message).collect(),
        _ => Vec::new(),
    };

    let folder_id = fields.remove("folderId").as_ref().and_then(identifier);

    Ok(Conversation {
        id,
        name,
        messages,
        folder_id,
        extra: fields,
    })
}

/// Keeps only messages with a known role and textual content.
fn clean_message(value: Value) -> Option<Message> {
    serde_json::from_value(value)
        .map_err(|e| tracing::debug!("Dropping malformed message: {}", e))
        .ok()
}

/// Reads an identifier that may have been written as a string or a number.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
