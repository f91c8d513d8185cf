use tracing::info;

use crate::hub::connections::ConnectionRegistry;
use crate::hub::rooms::{role_room, user_room, RoomRegistry};
use crate::models::{Notification, NotificationTarget, ServerEvent};

/// Deliver a server-initiated notification to its target scope.
///
/// User and role scopes resolve to their implicit rooms; `All` fans out to
/// every live connection.
pub fn notify(
    conns: &ConnectionRegistry,
    rooms: &RoomRegistry,
    target: &NotificationTarget,
    notification: Notification,
) {
    info!(
        "Delivering notification '{}' to {:?}",
        notification.title, target
    );
    let event = ServerEvent::NotificationNew(notification);
    match target {
        NotificationTarget::User(user_id) => {
            rooms.broadcast(conns, &user_room(user_id), &event, None)
        }
        NotificationTarget::Role(role) => rooms.broadcast(conns, &role_room(*role), &event, None),
        NotificationTarget::All => conns.send_all(&event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnId, Connection, Identity, Role};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn registered(
        conns: &mut ConnectionRegistry,
        rooms: &mut RoomRegistry,
        user_id: &str,
        role: Role,
    ) -> (ConnId, UnboundedReceiver<ServerEvent>) {
        let connection = Connection::new(Identity {
            user_id: user_id.to_string(),
            role,
        });
        let conn_id = connection.conn_id;
        let (tx, rx) = unbounded_channel();
        rooms.join(&user_room(user_id), conn_id);
        rooms.join(&role_room(role), conn_id);
        conns.register(connection, tx);
        (conn_id, rx)
    }

    #[test]
    fn role_scope_reaches_that_role_only() {
        let mut conns = ConnectionRegistry::new();
        let mut rooms = RoomRegistry::new();
        let (_r, mut rx_recruiter) =
            registered(&mut conns, &mut rooms, "u-r", Role::Recruiter);
        let (_c, mut rx_candidate) =
            registered(&mut conns, &mut rooms, "u-c", Role::Candidate);

        notify(
            &conns,
            &rooms,
            &NotificationTarget::Role(Role::Recruiter),
            Notification::new("Pipeline", "New applicant", "info"),
        );

        assert!(rx_recruiter.try_recv().is_ok());
        assert!(rx_candidate.try_recv().is_err());
    }

    #[test]
    fn user_scope_reaches_every_connection_of_that_user() {
        let mut conns = ConnectionRegistry::new();
        let mut rooms = RoomRegistry::new();
        let (_a, mut rx_a) = registered(&mut conns, &mut rooms, "u-1", Role::Recruiter);
        let (_b, mut rx_b) = registered(&mut conns, &mut rooms, "u-1", Role::Recruiter);
        let (_o, mut rx_other) = registered(&mut conns, &mut rooms, "u-2", Role::Recruiter);

        notify(
            &conns,
            &rooms,
            &NotificationTarget::User("u-1".into()),
            Notification::new("Reminder", "Interview in 10 minutes", "reminder"),
        );

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_other.try_recv().is_err());
    }
}
