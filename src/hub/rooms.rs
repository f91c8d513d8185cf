use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::hub::connections::ConnectionRegistry;
use crate::models::{ConnId, Role, ServerEvent};

/// Room name helpers. Rooms are flat strings, namespaced by kind.
pub fn interview_room(interview_id: &str) -> String {
    format!("interview:{}", interview_id)
}

pub fn webrtc_room(room_id: &str) -> String {
    format!("webrtc:{}", room_id)
}

pub fn note_room(note_id: &str) -> String {
    format!("note:{}", note_id)
}

pub fn user_room(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn role_room(role: Role) -> String {
    format!("role:{}", role)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomKind {
    Interview,
    Webrtc,
    Note,
    Role,
    User,
}

/// Split a room name into its kind and bare id.
pub fn parse_room(room_id: &str) -> Option<(RoomKind, &str)> {
    let (prefix, id) = room_id.split_once(':')?;
    let kind = match prefix {
        "interview" => RoomKind::Interview,
        "webrtc" => RoomKind::Webrtc,
        "note" => RoomKind::Note,
        "role" => RoomKind::Role,
        "user" => RoomKind::User,
        _ => return None,
    };
    Some((kind, id))
}

/// Generic many-to-many channel membership.
///
/// Rooms are created lazily on first join and destroyed on last leave;
/// zero-member rooms never persist. A connection may belong to arbitrarily
/// many rooms at once, so a reverse index keeps teardown cheap.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, HashSet<ConnId>>,
    memberships: HashMap<ConnId, HashSet<String>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent join. Returns true if the connection was not yet a member.
    pub fn join(&mut self, room_id: &str, conn_id: ConnId) -> bool {
        let newly = self
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn_id);
        if newly {
            self.memberships
                .entry(conn_id)
                .or_default()
                .insert(room_id.to_string());
        }
        newly
    }

    /// Leave a room, deleting it when the last member goes. Returns true if
    /// the connection was a member.
    pub fn leave(&mut self, room_id: &str, conn_id: ConnId) -> bool {
        let was_member = match self.rooms.get_mut(room_id) {
            Some(members) => members.remove(&conn_id),
            None => false,
        };
        if was_member {
            if self.rooms.get(room_id).is_some_and(|m| m.is_empty()) {
                self.rooms.remove(room_id);
                debug!("Room {} emptied, removed", room_id);
            }
            if let Some(rooms) = self.memberships.get_mut(&conn_id) {
                rooms.remove(room_id);
                if rooms.is_empty() {
                    self.memberships.remove(&conn_id);
                }
            }
        }
        was_member
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn members_of(&self, room_id: &str) -> Vec<ConnId> {
        self.rooms
            .get(room_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, conn_id: ConnId) -> Vec<String> {
        self.memberships
            .get(&conn_id)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a connection from every room it belongs to. Returns the rooms
    /// it was removed from.
    pub fn remove_connection(&mut self, conn_id: ConnId) -> Vec<String> {
        let rooms = match self.memberships.remove(&conn_id) {
            Some(rooms) => rooms,
            None => return Vec::new(),
        };
        let mut left = Vec::with_capacity(rooms.len());
        for room_id in rooms {
            if let Some(members) = self.rooms.get_mut(&room_id) {
                members.remove(&conn_id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                    debug!("Room {} emptied, removed", room_id);
                }
            }
            left.push(room_id);
        }
        left
    }

    /// Deliver to every current member except the excluded sender.
    pub fn broadcast(
        &self,
        conns: &ConnectionRegistry,
        room_id: &str,
        event: &ServerEvent,
        excluding: Option<ConnId>,
    ) {
        let members = match self.rooms.get(room_id) {
            Some(members) => members,
            None => return,
        };
        for member in members {
            if Some(*member) == excluding {
                continue;
            }
            conns.send_to(*member, event.clone());
        }
    }
}
