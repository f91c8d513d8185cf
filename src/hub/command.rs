use tokio::sync::{mpsc::UnboundedSender, oneshot};

use crate::collab::autosave::SaveOutcome;
use crate::collab::hub::SyncSender;
use crate::models::{
    ClientEvent, ConnId, Connection, Notification, NotificationTarget, PersistenceError,
};
use crate::models::ServerEvent;

/// Outbound half of one event socket.
pub type OutboundSender = UnboundedSender<ServerEvent>;

/// Typed commands processed by the hub actor, one at a time.
///
/// Every inbound frame, timer and completion report becomes one of these;
/// run-to-completion inside the actor is what makes the registry mutations
/// safe without locks.
pub enum HubCommand {
    /// An authenticated socket came up.
    Register {
        connection: Connection,
        sender: OutboundSender,
    },
    /// One validated event frame from a live connection.
    Client { conn_id: ConnId, event: ClientEvent },
    /// Transport closed, whatever the cause. Sent exactly once per socket.
    Disconnect { conn_id: ConnId },
    /// Server-initiated notification push.
    Notify {
        target: NotificationTarget,
        notification: Notification,
    },

    /// A document-sync stream subscribes to a note.
    SyncJoin {
        note_id: String,
        stream_id: ConnId,
        user_id: String,
        sender: SyncSender,
        reply: oneshot::Sender<Result<Vec<u8>, PersistenceError>>,
    },
    /// One opaque binary update frame from a sync stream.
    SyncUpdate {
        note_id: String,
        stream_id: ConnId,
        user_id: String,
        frame: Vec<u8>,
    },
    /// A sync stream went away.
    SyncLeave { note_id: String, stream_id: ConnId },

    /// A debounce timer elapsed.
    AutosaveFire { note_id: String, generation: u64 },
    /// A save task finished.
    SaveDone { outcome: SaveOutcome },

    // Introspection, used by diagnostics and tests.
    IsOnline {
        user_id: String,
        reply: oneshot::Sender<bool>,
    },
    CountOnline {
        reply: oneshot::Sender<usize>,
    },
    MembersOf {
        room_id: String,
        reply: oneshot::Sender<Vec<ConnId>>,
    },
}

impl HubCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HubCommand::Register { .. } => "register",
            HubCommand::Client { .. } => "client",
            HubCommand::Disconnect { .. } => "disconnect",
            HubCommand::Notify { .. } => "notify",
            HubCommand::SyncJoin { .. } => "syncJoin",
            HubCommand::SyncUpdate { .. } => "syncUpdate",
            HubCommand::SyncLeave { .. } => "syncLeave",
            HubCommand::AutosaveFire { .. } => "autosaveFire",
            HubCommand::SaveDone { .. } => "saveDone",
            HubCommand::IsOnline { .. } => "isOnline",
            HubCommand::CountOnline { .. } => "countOnline",
            HubCommand::MembersOf { .. } => "membersOf",
        }
    }
}
