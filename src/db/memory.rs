use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::gateway::PersistenceGateway;
use crate::models::{NoteEditRecord, NoteRecord, PersistenceError};

/// In-memory gateway for database-less runs and tests.
///
/// Notes vanish with the process; the trait contract is otherwise the same
/// as the Postgres gateway.
#[derive(Default)]
pub struct MemoryGateway {
    notes: Mutex<HashMap<String, NoteRecord>>,
    edits: Mutex<Vec<NoteEditRecord>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a note, as if it had been created by the main platform.
    pub fn seed_note(&self, note_id: &str, content: &str, title: &str) {
        let mut notes = self.notes.lock().unwrap();
        notes.insert(
            note_id.to_string(),
            NoteRecord {
                note_id: note_id.to_string(),
                content: content.to_string(),
                title: title.to_string(),
                updated_at: Utc::now(),
                updated_by: None,
            },
        );
    }

    /// Edit history for one note, oldest first.
    pub fn edits_for(&self, note_id: &str) -> Vec<NoteEditRecord> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.note_id == note_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn read_note(&self, note_id: &str) -> Result<Option<NoteRecord>, PersistenceError> {
        let notes = self.notes.lock().unwrap();
        Ok(notes.get(note_id).cloned())
    }

    async fn write_note(
        &self,
        note_id: &str,
        content: &str,
        title: Option<&str>,
        user_id: &str,
    ) -> Result<NoteRecord, PersistenceError> {
        let mut notes = self.notes.lock().unwrap();
        let previous_title = notes
            .get(note_id)
            .map(|n| n.title.clone())
            .unwrap_or_default();
        let record = NoteRecord {
            note_id: note_id.to_string(),
            content: content.to_string(),
            title: title.map(|t| t.to_string()).unwrap_or(previous_title),
            updated_at: Utc::now(),
            updated_by: Some(user_id.to_string()),
        };
        notes.insert(note_id.to_string(), record.clone());
        Ok(record)
    }

    async fn append_edit(&self, record: &NoteEditRecord) -> Result<(), PersistenceError> {
        self.edits.lock().unwrap().push(record.clone());
        Ok(())
    }
}
