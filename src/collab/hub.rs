use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::collab::merge::{DocumentMerge, LoroMerge};
use crate::db::PersistenceGateway;
use crate::models::{ConnId, PersistenceError};

/// Outbound half of one document-sync stream. Carries opaque binary frames.
pub type SyncSender = UnboundedSender<Vec<u8>>;

/// One shared note, materialized lazily and dropped with its last stream.
pub struct SharedDocument {
    doc: Box<dyn DocumentMerge>,
    subscribers: HashMap<ConnId, SyncSender>,
    pub last_persisted_content: String,
    pub last_persisted_at: Option<DateTime<Utc>>,
}

type MergeFactory = Box<dyn Fn() -> Box<dyn DocumentMerge> + Send>;

/// One CRDT document per shared note.
///
/// The hub's job is reliable relay plus state materialization; convergence
/// itself is the merge engine's job. Late joiners get the fully merged
/// snapshot, never a historical replay.
pub struct CollaborativeDocumentHub {
    docs: HashMap<String, SharedDocument>,
    engine: MergeFactory,
}

impl CollaborativeDocumentHub {
    pub fn new() -> Self {
        Self::with_engine(Box::new(|| Box::new(LoroMerge::new())))
    }

    /// Swap the convergence engine. Relay and persistence logic stay put.
    pub fn with_engine(engine: MergeFactory) -> Self {
        Self {
            docs: HashMap::new(),
            engine,
        }
    }

    /// Subscribe a stream to a document, materializing it on first join.
    ///
    /// Returns the fully merged snapshot for the joiner.
    pub async fn join(
        &mut self,
        note_id: &str,
        stream_id: ConnId,
        sender: SyncSender,
        gateway: &Arc<dyn PersistenceGateway>,
    ) -> Result<Vec<u8>, PersistenceError> {
        if !self.docs.contains_key(note_id) {
            // Materialize lazily from the last persisted content.
            let record = gateway.read_note(note_id).await?;
            let (content, persisted_at) = match record {
                Some(r) => (r.content, Some(r.updated_at)),
                None => (String::new(), None),
            };

            let mut doc = (self.engine)();
            doc.materialize(&content);
            info!(
                "Materialized document {} ({} persisted bytes)",
                note_id,
                content.len()
            );

            self.docs.insert(
                note_id.to_string(),
                SharedDocument {
                    doc,
                    subscribers: HashMap::new(),
                    last_persisted_content: content,
                    last_persisted_at: persisted_at,
                },
            );
        }

        let shared = self
            .docs
            .get_mut(note_id)
            .expect("document was just materialized");
        shared.subscribers.insert(stream_id, sender);

        shared
            .doc
            .snapshot()
            .map_err(|e| PersistenceError::Store(format!("snapshot export failed: {}", e)))
    }

    /// Merge one update frame and relay it verbatim to every other stream.
    ///
    /// Returns the materialized text after the merge, for the autosave
    /// debounce. A malformed frame is dropped without touching state.
    pub fn apply_update(&mut self, note_id: &str, origin: ConnId, frame: &[u8]) -> Option<String> {
        let shared = match self.docs.get_mut(note_id) {
            Some(shared) => shared,
            None => {
                warn!("Update frame for unknown document {}, dropping", note_id);
                return None;
            }
        };

        if let Err(e) = shared.doc.apply_update(frame) {
            warn!("Dropping malformed update frame for {}: {}", note_id, e);
            return None;
        }

        for (stream_id, sender) in &shared.subscribers {
            if *stream_id == origin {
                continue;
            }
            let _ = sender.send(frame.to_vec());
        }

        Some(shared.doc.text())
    }

    /// Unsubscribe a stream. Returns true when this dropped the document.
    pub fn leave(&mut self, note_id: &str, stream_id: ConnId) -> bool {
        if let Some(shared) = self.docs.get_mut(note_id) {
            shared.subscribers.remove(&stream_id);
            if shared.subscribers.is_empty() {
                self.docs.remove(note_id);
                info!("Dropped document {} (no streams left)", note_id);
                return true;
            }
        }
        false
    }

    pub fn has_subscribers(&self, note_id: &str) -> bool {
        self.docs
            .get(note_id)
            .map(|d| !d.subscribers.is_empty())
            .unwrap_or(false)
    }

    /// Live materialized text, if the document is currently in memory.
    pub fn live_text(&self, note_id: &str) -> Option<String> {
        self.docs.get(note_id).map(|d| d.doc.text())
    }

    /// Record what a committed save just wrote, if the document is live.
    pub fn mark_persisted(&mut self, note_id: &str, content: &str, at: DateTime<Utc>) {
        if let Some(shared) = self.docs.get_mut(note_id) {
            shared.last_persisted_content = content.to_string();
            shared.last_persisted_at = Some(at);
        }
    }
}

impl Default for CollaborativeDocumentHub {
    fn default() -> Self {
        Self::new()
    }
}
