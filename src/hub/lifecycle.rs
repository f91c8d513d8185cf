use tracing::info;

use crate::collab::autosave::NoteEditCoordinator;
use crate::collab::hub::CollaborativeDocumentHub;
use crate::hub::connections::ConnectionRegistry;
use crate::hub::rooms::{parse_room, RoomKind, RoomRegistry};
use crate::models::{ConnId, Connection, ServerEvent};

/// Leave one room, telling the members who stayed.
///
/// Explicit leave handlers and the disconnect path both go through here so
/// cleanup logic never diverges. Returns true if the connection was a
/// member.
pub fn leave_room(
    rooms: &mut RoomRegistry,
    conns: &ConnectionRegistry,
    room_id: &str,
    connection: &Connection,
) -> bool {
    if !rooms.leave(room_id, connection.conn_id) {
        return false;
    }
    emit_user_left(rooms, conns, room_id, connection);
    true
}

/// Tear down everything a closed connection owned.
///
/// Invoked exactly once per close regardless of cause: drops presence,
/// leaves every room (announcing each departure), and cancels autosave
/// timers for note rooms that just emptied.
pub fn on_disconnect(
    conns: &mut ConnectionRegistry,
    rooms: &mut RoomRegistry,
    docs: &CollaborativeDocumentHub,
    coordinator: &mut NoteEditCoordinator,
    conn_id: ConnId,
) -> Option<Connection> {
    let connection = conns.unregister(conn_id)?;
    info!(
        "Connection {} closed for user {}",
        conn_id,
        connection.user_id()
    );

    for room_id in rooms.remove_connection(conn_id) {
        emit_user_left(rooms, conns, &room_id, &connection);
        cancel_autosave_if_abandoned(rooms, docs, coordinator, &room_id);
    }

    Some(connection)
}

/// Once a note room has fully emptied (and no sync stream is still on the
/// document), its debounce timer must not linger.
pub fn cancel_autosave_if_abandoned(
    rooms: &RoomRegistry,
    docs: &CollaborativeDocumentHub,
    coordinator: &mut NoteEditCoordinator,
    room_id: &str,
) {
    if let Some((RoomKind::Note, note_id)) = parse_room(room_id) {
        if !rooms.contains(room_id) && !docs.has_subscribers(note_id) {
            coordinator.cancel(note_id);
        }
    }
}

fn emit_user_left(
    rooms: &RoomRegistry,
    conns: &ConnectionRegistry,
    room_id: &str,
    connection: &Connection,
) {
    // Implicit user:/role: rooms come and go silently.
    let event = match parse_room(room_id) {
        Some((RoomKind::Interview, interview_id)) => Some(ServerEvent::InterviewUserLeft {
            interview_id: interview_id.to_string(),
            user_id: connection.user_id().to_string(),
        }),
        Some((RoomKind::Webrtc, webrtc_id)) => Some(ServerEvent::WebrtcUserLeft {
            room_id: webrtc_id.to_string(),
            connection_id: connection.conn_id,
            user_id: connection.user_id().to_string(),
        }),
        Some((RoomKind::Note, note_id)) => Some(ServerEvent::NoteUserLeft {
            note_id: note_id.to_string(),
            user_id: connection.user_id().to_string(),
        }),
        _ => None,
    };
    if let Some(event) = event {
        rooms.broadcast(conns, room_id, &event, Some(connection.conn_id));
    }
}
