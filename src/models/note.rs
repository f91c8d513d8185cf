use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable note row as surfaced by the persistence gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub note_id: String,
    pub content: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

/// Append-only history entry, written once per committed save.
///
/// Keystroke-level edits are never individually persisted; a record exists
/// only for an explicit save or a debounced autosave.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEditRecord {
    pub note_id: String,
    pub user_id: String,
    pub content_snapshot: String,
    pub timestamp: DateTime<Utc>,
}

impl NoteEditRecord {
    pub fn new(note_id: &str, user_id: &str, content_snapshot: &str) -> Self {
        Self {
            note_id: note_id.to_string(),
            user_id: user_id.to_string(),
            content_snapshot: content_snapshot.to_string(),
            timestamp: Utc::now(),
        }
    }
}
