use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::extract_token;
use crate::hub::HubHandle;
use crate::models::Identity;
use crate::ws::session::SocketQuery;
use crate::AppState;

/// Document sync handler: one logical stream per note, carrying opaque
/// binary CRDT update frames. Authenticated via the connection URL before
/// upgrade.
pub async fn sync_socket_handler(
    State(app): State<AppState>,
    Path(note_id): Path<String>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<SocketQuery>,
) -> Response {
    let token = extract_token(&headers, query.token.as_deref());
    let identity = match app.gate.authenticate(token.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejected sync socket handshake for {}: {}", note_id, e);
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_sync_stream(socket, note_id, identity, app.hub))
}

/// Handle one document stream
async fn handle_sync_stream(socket: WebSocket, note_id: String, identity: Identity, hub: HubHandle) {
    let stream_id = Uuid::new_v4();
    let user_id = identity.user_id;
    info!(
        "Sync stream {} opened on note {} by {}",
        stream_id, note_id, user_id
    );

    let (frames_tx, mut frames_rx) = unbounded_channel::<Vec<u8>>();
    let snapshot = match hub
        .sync_join(&note_id, stream_id, &user_id, frames_tx)
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to open document stream for {}: {}", note_id, e);
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    // First frame is the fully merged state, never a historical replay.
    if sender.send(Message::Binary(snapshot)).await.is_err() {
        hub.sync_leave(&note_id, stream_id);
        return;
    }

    // Inbound frames are merged and relayed; everything else is ignored.
    let inbound_hub = hub.clone();
    let inbound_note = note_id.clone();
    let inbound_user = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Binary(frame) => {
                    inbound_hub.sync_update(&inbound_note, stream_id, &inbound_user, frame);
                }
                Message::Close(_) => break,
                _ => continue,
            }
        }
    });

    // Outbound: frames other streams merged, relayed verbatim.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = frames_rx.recv().await {
            if sender.send(Message::Binary(frame)).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut recv_task) => send_task.abort(),
        _ = (&mut send_task) => recv_task.abort(),
    };

    hub.sync_leave(&note_id, stream_id);
    info!("Sync stream {} on note {} closed", stream_id, note_id);
}
