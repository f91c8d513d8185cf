use async_trait::async_trait;

use crate::models::{NoteEditRecord, NoteRecord, PersistenceError};

/// Boundary to durable storage.
///
/// The live subsystem owns all in-memory state exclusively; everything
/// durable goes through this trait. Note rows are read to materialize a
/// document and written on a committed save, and one edit record is
/// appended per committed save.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn read_note(&self, note_id: &str) -> Result<Option<NoteRecord>, PersistenceError>;

    async fn write_note(
        &self,
        note_id: &str,
        content: &str,
        title: Option<&str>,
        user_id: &str,
    ) -> Result<NoteRecord, PersistenceError>;

    async fn append_edit(&self, record: &NoteEditRecord) -> Result<(), PersistenceError>;
}
