use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::db::PersistenceGateway;
use crate::hub::command::HubCommand;
use crate::models::{ConnId, NoteEditRecord, NoteRecord, PersistenceError};

/// What asked for a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOrigin {
    /// Quiet-period debounce after the last local edit.
    Autosave,
    /// A `note:save` from this connection; it gets the failure report.
    Explicit { requester: ConnId },
}

/// One durable write, queued per note so writes never interleave.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub note_id: String,
    pub content: String,
    pub title: Option<String>,
    pub user_id: String,
    pub origin: SaveOrigin,
}

/// Completion report from a save task, posted back to the hub actor.
#[derive(Debug)]
pub struct SaveOutcome {
    pub note_id: String,
    pub origin: SaveOrigin,
    pub result: Result<(NoteRecord, NoteEditRecord), PersistenceError>,
}

struct PendingEdit {
    content: String,
    user_id: String,
}

#[derive(Default)]
struct NoteEditState {
    pending: Option<PendingEdit>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    saving: bool,
    queued: VecDeque<SaveRequest>,
}

impl NoteEditState {
    fn idle(&self) -> bool {
        self.pending.is_none() && self.timer.is_none() && !self.saving && self.queued.is_empty()
    }
}

/// Bridges live edits with durable saves.
///
/// Keystroke-level edits are never individually persisted; a write happens
/// on an explicit save or once a fixed quiet period elapses after the last
/// edit. Saves for the same note are serialized: a second save queues
/// behind the one in flight.
pub struct NoteEditCoordinator {
    notes: HashMap<String, NoteEditState>,
    debounce: Duration,
    commands: UnboundedSender<HubCommand>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl NoteEditCoordinator {
    pub fn new(
        debounce: Duration,
        commands: UnboundedSender<HubCommand>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            notes: HashMap::new(),
            debounce,
            commands,
            gateway,
        }
    }

    /// Note a local edit and (re)arm the debounce timer.
    pub fn record_edit(&mut self, note_id: &str, content: &str, user_id: &str) {
        let state = self.notes.entry(note_id.to_string()).or_default();

        state.pending = Some(PendingEdit {
            content: content.to_string(),
            user_id: user_id.to_string(),
        });
        state.generation += 1;

        // Each new edit resets the quiet period.
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let generation = state.generation;
        let debounce = self.debounce;
        let commands = self.commands.clone();
        let note = note_id.to_string();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = commands.send(HubCommand::AutosaveFire {
                note_id: note,
                generation,
            });
        }));
    }

    /// A debounce timer elapsed. Stale generations are ignored.
    pub fn autosave_fire(&mut self, note_id: &str, generation: u64) {
        let state = match self.notes.get_mut(note_id) {
            Some(state) => state,
            None => return,
        };
        if state.generation != generation {
            return;
        }
        state.timer = None;

        let edit = match state.pending.take() {
            Some(edit) => edit,
            None => return,
        };
        debug!("Autosave firing for note {}", note_id);

        self.submit(SaveRequest {
            note_id: note_id.to_string(),
            content: edit.content,
            title: None,
            user_id: edit.user_id,
            origin: SaveOrigin::Autosave,
        });
    }

    /// The durability boundary: write through the gateway and append one
    /// edit record. The caller broadcasts `note:saved` once the outcome
    /// comes back.
    pub fn explicit_save(
        &mut self,
        note_id: &str,
        content: &str,
        title: Option<&str>,
        user_id: &str,
        requester: ConnId,
    ) {
        // The explicit save supersedes any pending autosave of older content.
        let state = self.notes.entry(note_id.to_string()).or_default();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending = None;

        self.submit(SaveRequest {
            note_id: note_id.to_string(),
            content: content.to_string(),
            title: title.map(|t| t.to_string()),
            user_id: user_id.to_string(),
            origin: SaveOrigin::Explicit { requester },
        });
    }

    /// A save task finished; start the next queued one, if any.
    pub fn save_done(&mut self, note_id: &str) {
        let next = match self.notes.get_mut(note_id) {
            Some(state) => {
                state.saving = false;
                state.queued.pop_front()
            }
            None => None,
        };
        if let Some(request) = next {
            self.submit(request);
        }
        self.drop_if_idle(note_id);
    }

    /// The note room emptied: cancel the timer outright, no orphan timers.
    pub fn cancel(&mut self, note_id: &str) {
        if let Some(state) = self.notes.get_mut(note_id) {
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.pending = None;
            info!("Cancelled autosave for note {} (room empty)", note_id);
        }
        self.drop_if_idle(note_id);
    }

    fn submit(&mut self, request: SaveRequest) {
        let state = self.notes.entry(request.note_id.clone()).or_default();
        if state.saving {
            info!(
                "Save already in flight for note {}, queueing",
                request.note_id
            );
            state.queued.push_back(request);
            return;
        }
        state.saving = true;

        let gateway = self.gateway.clone();
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let note_id = request.note_id.clone();
            let origin = request.origin;
            let result = run_save(gateway, &request).await;
            let _ = commands.send(HubCommand::SaveDone {
                outcome: SaveOutcome {
                    note_id,
                    origin,
                    result,
                },
            });
        });
    }

    fn drop_if_idle(&mut self, note_id: &str) {
        if self.notes.get(note_id).map(|s| s.idle()).unwrap_or(false) {
            self.notes.remove(note_id);
        }
    }
}

async fn run_save(
    gateway: Arc<dyn PersistenceGateway>,
    request: &SaveRequest,
) -> Result<(NoteRecord, NoteEditRecord), PersistenceError> {
    let note = gateway
        .write_note(
            &request.note_id,
            &request.content,
            request.title.as_deref(),
            &request.user_id,
        )
        .await?;

    let record = NoteEditRecord::new(&request.note_id, &request.user_id, &request.content);
    gateway.append_edit(&record).await?;

    Ok((note, record))
}
