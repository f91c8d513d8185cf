use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::hub::command::OutboundSender;
use crate::models::{ConnId, Connection, ServerEvent};

/// One registered socket: its identity plus its outbound channel.
pub struct ConnectionEntry {
    pub connection: Connection,
    pub sender: OutboundSender,
}

/// Tracks live connections per user, many per user.
///
/// Invariant: a userId key exists iff its connection set is non-empty, so
/// `is_online` reflects true liveness.
#[derive(Default)]
pub struct ConnectionRegistry {
    conns: HashMap<ConnId, ConnectionEntry>,
    users: HashMap<String, HashSet<ConnId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection: Connection, sender: OutboundSender) {
        self.users
            .entry(connection.user_id().to_string())
            .or_default()
            .insert(connection.conn_id);
        self.conns
            .insert(connection.conn_id, ConnectionEntry { connection, sender });
    }

    /// Remove a connection, dropping the user entry once its set is empty.
    pub fn unregister(&mut self, conn_id: ConnId) -> Option<Connection> {
        let entry = self.conns.remove(&conn_id)?;
        let user_id = entry.connection.user_id().to_string();
        if let Some(set) = self.users.get_mut(&user_id) {
            set.remove(&conn_id);
            if set.is_empty() {
                self.users.remove(&user_id);
            }
        }
        Some(entry.connection)
    }

    pub fn get(&self, conn_id: ConnId) -> Option<&ConnectionEntry> {
        self.conns.get(&conn_id)
    }

    /// Whether a user currently holds at least one live connection.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    /// Number of distinct users currently online.
    pub fn count_online(&self) -> usize {
        self.users.len()
    }

    /// Best-effort delivery to one connection. Returns false if it is not
    /// live; the caller decides whether that matters.
    pub fn send_to(&self, conn_id: ConnId, event: ServerEvent) -> bool {
        match self.conns.get(&conn_id) {
            Some(entry) => entry.sender.send(event).is_ok(),
            None => {
                debug!("Delivery to unknown connection {}, dropping", conn_id);
                false
            }
        }
    }

    /// Deliver to every live connection.
    pub fn send_all(&self, event: &ServerEvent) {
        for entry in self.conns.values() {
            let _ = entry.sender.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, Role};
    use tokio::sync::mpsc::unbounded_channel;

    fn connection(user_id: &str, role: Role) -> Connection {
        Connection::new(Identity {
            user_id: user_id.to_string(),
            role,
        })
    }

    #[test]
    fn presence_follows_the_last_connection() {
        let mut registry = ConnectionRegistry::new();
        let c1 = connection("u-1", Role::Recruiter);
        let c2 = connection("u-1", Role::Recruiter);
        let (tx, _rx) = unbounded_channel();

        registry.register(c1.clone(), tx.clone());
        registry.register(c2.clone(), tx);
        assert!(registry.is_online("u-1"));
        assert_eq!(registry.count_online(), 1);

        registry.unregister(c1.conn_id);
        assert!(registry.is_online("u-1"));

        registry.unregister(c2.conn_id);
        assert!(!registry.is_online("u-1"));
        assert_eq!(registry.count_online(), 0);
    }

    #[test]
    fn unregister_never_touches_another_users_set() {
        let mut registry = ConnectionRegistry::new();
        let c1 = connection("u-1", Role::Recruiter);
        let c2 = connection("u-2", Role::Candidate);
        let (tx, _rx) = unbounded_channel();

        registry.register(c1.clone(), tx.clone());
        registry.register(c2.clone(), tx);

        registry.unregister(c1.conn_id);
        assert!(!registry.is_online("u-1"));
        assert!(registry.is_online("u-2"));
    }

    #[test]
    fn unregister_unknown_connection_is_a_noop() {
        let mut registry = ConnectionRegistry::new();
        assert!(registry.unregister(uuid::Uuid::new_v4()).is_none());
        assert_eq!(registry.count_online(), 0);
    }
}
