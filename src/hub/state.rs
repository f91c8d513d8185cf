use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::collab::autosave::{NoteEditCoordinator, SaveOrigin, SaveOutcome};
use crate::collab::hub::{CollaborativeDocumentHub, SyncSender};
use crate::db::PersistenceGateway;
use crate::hub::command::{HubCommand, OutboundSender};
use crate::hub::connections::ConnectionRegistry;
use crate::hub::lifecycle;
use crate::hub::rooms::{
    interview_room, note_room, role_room, user_room, webrtc_room, RoomRegistry,
};
use crate::hub::{notifier, signaling};
use crate::models::{
    ClientEvent, ConnId, Connection, Notification, NotificationTarget, PersistenceError, Role,
    ServerEvent, WebrtcUser,
};

/// The hub actor: one task owning every registry, processing typed
/// commands run-to-completion.
pub struct Hub {
    state: HubState,
    commands: UnboundedReceiver<HubCommand>,
}

/// Cheap, cloneable entry point into the hub actor.
#[derive(Clone)]
pub struct HubHandle {
    commands: UnboundedSender<HubCommand>,
}

struct HubState {
    connections: ConnectionRegistry,
    rooms: RoomRegistry,
    docs: CollaborativeDocumentHub,
    coordinator: NoteEditCoordinator,
    gateway: Arc<dyn PersistenceGateway>,
}

impl Hub {
    /// Build an isolated hub. Nothing here is global: tests construct as
    /// many as they like.
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        autosave_debounce: Duration,
    ) -> (Self, HubHandle) {
        let (tx, rx) = unbounded_channel();
        let coordinator = NoteEditCoordinator::new(autosave_debounce, tx.clone(), gateway.clone());
        let state = HubState {
            connections: ConnectionRegistry::new(),
            rooms: RoomRegistry::new(),
            docs: CollaborativeDocumentHub::new(),
            coordinator,
            gateway,
        };
        (
            Self {
                state,
                commands: rx,
            },
            HubHandle { commands: tx },
        )
    }

    /// Drive the actor. Runs for the life of the process.
    pub async fn run(mut self) {
        info!("Hub actor started");
        while let Some(command) = self.commands.recv().await {
            self.state.handle(command).await;
        }
        info!("Hub actor stopped");
    }
}

impl HubHandle {
    pub fn register(&self, connection: Connection, sender: OutboundSender) {
        let _ = self.commands.send(HubCommand::Register { connection, sender });
    }

    pub fn client_event(&self, conn_id: ConnId, event: ClientEvent) {
        let _ = self.commands.send(HubCommand::Client { conn_id, event });
    }

    pub fn disconnect(&self, conn_id: ConnId) {
        let _ = self.commands.send(HubCommand::Disconnect { conn_id });
    }

    pub fn notify(&self, target: NotificationTarget, notification: Notification) {
        let _ = self.commands.send(HubCommand::Notify {
            target,
            notification,
        });
    }

    pub async fn sync_join(
        &self,
        note_id: &str,
        stream_id: ConnId,
        user_id: &str,
        sender: SyncSender,
    ) -> Result<Vec<u8>, PersistenceError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.commands.send(HubCommand::SyncJoin {
            note_id: note_id.to_string(),
            stream_id,
            user_id: user_id.to_string(),
            sender,
            reply,
        });
        rx.await
            .unwrap_or_else(|_| Err(PersistenceError::Store("hub unavailable".to_string())))
    }

    pub fn sync_update(&self, note_id: &str, stream_id: ConnId, user_id: &str, frame: Vec<u8>) {
        let _ = self.commands.send(HubCommand::SyncUpdate {
            note_id: note_id.to_string(),
            stream_id,
            user_id: user_id.to_string(),
            frame,
        });
    }

    pub fn sync_leave(&self, note_id: &str, stream_id: ConnId) {
        let _ = self.commands.send(HubCommand::SyncLeave {
            note_id: note_id.to_string(),
            stream_id,
        });
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        let _ = self.commands.send(HubCommand::IsOnline {
            user_id: user_id.to_string(),
            reply,
        });
        rx.await.unwrap_or(false)
    }

    pub async fn count_online(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        let _ = self.commands.send(HubCommand::CountOnline { reply });
        rx.await.unwrap_or(0)
    }

    pub async fn members_of(&self, room_id: &str) -> Vec<ConnId> {
        let (reply, rx) = oneshot::channel();
        let _ = self.commands.send(HubCommand::MembersOf {
            room_id: room_id.to_string(),
            reply,
        });
        rx.await.unwrap_or_default()
    }
}

impl HubState {
    async fn handle(&mut self, command: HubCommand) {
        debug!("Hub command: {}", command.name());
        match command {
            HubCommand::Register { connection, sender } => self.register(connection, sender),
            HubCommand::Client { conn_id, event } => {
                // Frames can race teardown; an unknown sender is stale, not an error.
                let connection = match self.connections.get(conn_id) {
                    Some(entry) => entry.connection.clone(),
                    None => {
                        debug!("Event from unregistered connection {}, ignoring", conn_id);
                        return;
                    }
                };
                self.dispatch_event(connection, event).await;
            }
            HubCommand::Disconnect { conn_id } => {
                lifecycle::on_disconnect(
                    &mut self.connections,
                    &mut self.rooms,
                    &self.docs,
                    &mut self.coordinator,
                    conn_id,
                );
            }
            HubCommand::Notify {
                target,
                notification,
            } => notifier::notify(&self.connections, &self.rooms, &target, notification),

            HubCommand::SyncJoin {
                note_id,
                stream_id,
                user_id,
                sender,
                reply,
            } => {
                info!("Sync stream {} joined note {} ({})", stream_id, note_id, user_id);
                let result = self
                    .docs
                    .join(&note_id, stream_id, sender, &self.gateway)
                    .await;
                let _ = reply.send(result);
            }
            HubCommand::SyncUpdate {
                note_id,
                stream_id,
                user_id,
                frame,
            } => {
                if let Some(text) = self.docs.apply_update(&note_id, stream_id, &frame) {
                    self.coordinator.record_edit(&note_id, &text, &user_id);
                }
            }
            HubCommand::SyncLeave { note_id, stream_id } => {
                self.docs.leave(&note_id, stream_id);
                lifecycle::cancel_autosave_if_abandoned(
                    &self.rooms,
                    &self.docs,
                    &mut self.coordinator,
                    &note_room(&note_id),
                );
            }

            HubCommand::AutosaveFire {
                note_id,
                generation,
            } => self.coordinator.autosave_fire(&note_id, generation),
            HubCommand::SaveDone { outcome } => self.handle_save_done(outcome),

            HubCommand::IsOnline { user_id, reply } => {
                let _ = reply.send(self.connections.is_online(&user_id));
            }
            HubCommand::CountOnline { reply } => {
                let _ = reply.send(self.connections.count_online());
            }
            HubCommand::MembersOf { room_id, reply } => {
                let _ = reply.send(self.rooms.members_of(&room_id));
            }
        }
    }

    fn register(&mut self, connection: Connection, sender: OutboundSender) {
        let conn_id = connection.conn_id;
        // Every connection lives in its user and role rooms from the start.
        self.rooms.join(&user_room(connection.user_id()), conn_id);
        self.rooms.join(&role_room(connection.role()), conn_id);
        info!(
            "Registered connection {} for user {} ({})",
            conn_id,
            connection.user_id(),
            connection.role()
        );
        self.connections.register(connection, sender);
    }

    async fn dispatch_event(&mut self, connection: Connection, event: ClientEvent) {
        match event {
            ClientEvent::CandidateStatusUpdate {
                candidate_id,
                status,
            } => {
                // Status changes concern the hiring side only.
                let event = ServerEvent::CandidateStatusUpdated {
                    candidate_id,
                    status,
                    updated_by: connection.user_id().to_string(),
                };
                self.rooms
                    .broadcast(&self.connections, &role_room(Role::Recruiter), &event, None);
                self.rooms
                    .broadcast(&self.connections, &role_room(Role::Admin), &event, None);
            }

            ClientEvent::InterviewJoin { interview_id } => {
                let room = interview_room(&interview_id);
                if self.rooms.join(&room, connection.conn_id) {
                    let event = ServerEvent::InterviewUserJoined {
                        interview_id,
                        user_id: connection.user_id().to_string(),
                        role: connection.role(),
                    };
                    self.rooms
                        .broadcast(&self.connections, &room, &event, Some(connection.conn_id));
                }
            }
            ClientEvent::InterviewLeave { interview_id } => {
                lifecycle::leave_room(
                    &mut self.rooms,
                    &self.connections,
                    &interview_room(&interview_id),
                    &connection,
                );
            }
            ClientEvent::InterviewCodeUpdate {
                interview_id,
                code,
                language,
            } => {
                let room = interview_room(&interview_id);
                let event = ServerEvent::InterviewCodeUpdated {
                    interview_id,
                    code,
                    language,
                    user_id: connection.user_id().to_string(),
                };
                self.rooms
                    .broadcast(&self.connections, &room, &event, Some(connection.conn_id));
            }
            ClientEvent::InterviewCodeSave {
                interview_id,
                code,
                language,
            } => {
                // Saves echo back to the saver as well.
                let room = interview_room(&interview_id);
                let event = ServerEvent::InterviewCodeSaved {
                    interview_id,
                    code,
                    language,
                    user_id: connection.user_id().to_string(),
                    saved_at: Utc::now(),
                };
                self.rooms.broadcast(&self.connections, &room, &event, None);
            }

            ClientEvent::ChatSendMessage {
                interview_id,
                message,
            } => {
                let room = interview_room(&interview_id);
                let event = ServerEvent::ChatNewMessage {
                    interview_id,
                    message,
                    user_id: connection.user_id().to_string(),
                    role: connection.role(),
                    timestamp: Utc::now(),
                };
                self.rooms.broadcast(&self.connections, &room, &event, None);
            }

            ClientEvent::WebrtcJoinRoom { room_id } => {
                let room = webrtc_room(&room_id);
                // Tell the joiner who is already there, then announce it.
                let users: Vec<WebrtcUser> = self
                    .rooms
                    .members_of(&room)
                    .into_iter()
                    .filter_map(|member| {
                        self.connections.get(member).map(|entry| WebrtcUser {
                            connection_id: member,
                            user_id: entry.connection.user_id().to_string(),
                        })
                    })
                    .collect();
                self.connections.send_to(
                    connection.conn_id,
                    ServerEvent::WebrtcUsersInRoom {
                        room_id: room_id.clone(),
                        users,
                    },
                );
                if self.rooms.join(&room, connection.conn_id) {
                    let event = ServerEvent::WebrtcUserJoined {
                        room_id,
                        connection_id: connection.conn_id,
                        user_id: connection.user_id().to_string(),
                    };
                    self.rooms
                        .broadcast(&self.connections, &room, &event, Some(connection.conn_id));
                }
            }
            ClientEvent::WebrtcLeaveRoom { room_id } => {
                lifecycle::leave_room(
                    &mut self.rooms,
                    &self.connections,
                    &webrtc_room(&room_id),
                    &connection,
                );
            }
            ClientEvent::WebrtcOffer { target, payload } => {
                signaling::relay(
                    &self.connections,
                    connection.conn_id,
                    target,
                    signaling::SignalKind::Offer,
                    payload,
                );
            }
            ClientEvent::WebrtcAnswer { target, payload } => {
                signaling::relay(
                    &self.connections,
                    connection.conn_id,
                    target,
                    signaling::SignalKind::Answer,
                    payload,
                );
            }
            ClientEvent::WebrtcIceCandidate { target, payload } => {
                signaling::relay(
                    &self.connections,
                    connection.conn_id,
                    target,
                    signaling::SignalKind::IceCandidate,
                    payload,
                );
            }
            ClientEvent::WebrtcScreenShare {
                room_id,
                is_sharing,
            } => {
                // Everyone in the room reacts, so this is a broadcast, not
                // a point-to-point signal.
                let room = webrtc_room(&room_id);
                let event = ServerEvent::WebrtcScreenShare {
                    room_id,
                    user_id: connection.user_id().to_string(),
                    is_sharing,
                };
                self.rooms
                    .broadcast(&self.connections, &room, &event, Some(connection.conn_id));
            }

            ClientEvent::NoteJoin { note_id } => self.note_join(&connection, note_id).await,
            ClientEvent::NoteLeave { note_id } => {
                let room = note_room(&note_id);
                lifecycle::leave_room(&mut self.rooms, &self.connections, &room, &connection);
                lifecycle::cancel_autosave_if_abandoned(
                    &self.rooms,
                    &self.docs,
                    &mut self.coordinator,
                    &room,
                );
            }
            ClientEvent::NoteUpdate {
                note_id,
                content,
                title,
            } => {
                let event = ServerEvent::NoteContentUpdate {
                    note_id: note_id.clone(),
                    content: content.clone(),
                    title,
                    user_id: connection.user_id().to_string(),
                };
                self.rooms.broadcast(
                    &self.connections,
                    &note_room(&note_id),
                    &event,
                    Some(connection.conn_id),
                );
                self.coordinator
                    .record_edit(&note_id, &content, connection.user_id());
            }
            ClientEvent::NoteSave {
                note_id,
                content,
                title,
            } => {
                self.coordinator.explicit_save(
                    &note_id,
                    &content,
                    title.as_deref(),
                    connection.user_id(),
                    connection.conn_id,
                );
            }
            ClientEvent::NoteCursorUpdate { note_id, position } => {
                let event = ServerEvent::NoteCursorUpdate {
                    note_id: note_id.clone(),
                    user_id: connection.user_id().to_string(),
                    position,
                };
                self.rooms.broadcast(
                    &self.connections,
                    &note_room(&note_id),
                    &event,
                    Some(connection.conn_id),
                );
            }
        }
    }

    async fn note_join(&mut self, connection: &Connection, note_id: String) {
        let room = note_room(&note_id);
        if self.rooms.join(&room, connection.conn_id) {
            let event = ServerEvent::NoteUserJoined {
                note_id: note_id.clone(),
                user_id: connection.user_id().to_string(),
            };
            self.rooms
                .broadcast(&self.connections, &room, &event, Some(connection.conn_id));
        }

        // Persisted row for title and metadata; a read failure degrades to
        // an empty note rather than a dropped join.
        let record = match self.gateway.read_note(&note_id).await {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to read note {}: {}", note_id, e);
                None
            }
        };
        let (content, title, last_updated) = match record {
            Some(r) => (r.content, r.title, Some(r.updated_at)),
            None => (String::new(), String::new(), None),
        };
        // The live CRDT state wins over the persisted row.
        let content = self.docs.live_text(&note_id).unwrap_or(content);

        let mut editors: Vec<String> = self
            .rooms
            .members_of(&room)
            .into_iter()
            .filter_map(|member| {
                self.connections
                    .get(member)
                    .map(|entry| entry.connection.user_id().to_string())
            })
            .collect();
        editors.sort();
        editors.dedup();

        self.connections.send_to(
            connection.conn_id,
            ServerEvent::NoteCurrent {
                note_id,
                content,
                title,
                last_updated,
                editors,
            },
        );
    }

    fn handle_save_done(&mut self, outcome: SaveOutcome) {
        self.coordinator.save_done(&outcome.note_id);
        match outcome.result {
            Ok((note, record)) => {
                self.docs
                    .mark_persisted(&outcome.note_id, &note.content, note.updated_at);
                match outcome.origin {
                    SaveOrigin::Explicit { .. } => {
                        // The whole room, saver included, hears about the commit.
                        let event = ServerEvent::NoteSaved {
                            note_id: outcome.note_id.clone(),
                            title: note.title,
                            saved_by: record.user_id,
                            saved_at: record.timestamp,
                        };
                        self.rooms.broadcast(
                            &self.connections,
                            &note_room(&outcome.note_id),
                            &event,
                            None,
                        );
                    }
                    SaveOrigin::Autosave => {
                        debug!("Autosaved note {}", outcome.note_id);
                    }
                }
            }
            Err(e) => {
                // Live state is never rolled back; editing continues. An
                // explicit saver is told so it can retry.
                error!("Save failed for note {}: {}", outcome.note_id, e);
                if let SaveOrigin::Explicit { requester } = outcome.origin {
                    self.connections.send_to(
                        requester,
                        ServerEvent::Error {
                            message: format!("Failed to save note {}: {}", outcome.note_id, e),
                        },
                    );
                }
            }
        }
    }
}
