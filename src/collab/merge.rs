use loro::{ExportMode, LoroDoc};

/// Convergence engine behind the document hub.
///
/// The hub relays frames and materializes state; it never interprets
/// content. Everything algorithm-specific sits behind this trait so the
/// engine can be swapped without touching relay or persistence logic.
pub trait DocumentMerge: Send {
    /// Seed an empty document from the last persisted plain-text content.
    fn materialize(&mut self, content: &str);

    /// Merge one opaque update frame into the authoritative state.
    fn apply_update(&mut self, frame: &[u8]) -> Result<(), String>;

    /// Export the fully merged state for a late joiner.
    fn snapshot(&self) -> Result<Vec<u8>, String>;

    /// Current materialized text of the shared note.
    fn text(&self) -> String;
}

/// Loro-backed merge engine. Note text lives in the `content` container.
pub struct LoroMerge {
    doc: LoroDoc,
}

impl LoroMerge {
    pub fn new() -> Self {
        Self { doc: LoroDoc::new() }
    }
}

impl Default for LoroMerge {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentMerge for LoroMerge {
    fn materialize(&mut self, content: &str) {
        let text = self.doc.get_text("content");
        let _ = text.insert(0, content);
    }

    fn apply_update(&mut self, frame: &[u8]) -> Result<(), String> {
        self.doc
            .import(frame)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn snapshot(&self) -> Result<Vec<u8>, String> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| e.to_string())
    }

    fn text(&self) -> String {
        self.doc.get_text("content").to_string()
    }
}
