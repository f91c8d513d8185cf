use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info, warn};

use crate::auth::extract_token;
use crate::hub::HubHandle;
use crate::models::{ClientEvent, Connection, Identity, ServerEvent};
use crate::AppState;

#[derive(Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// Event socket handler. Authenticates the handshake before upgrading; a
/// bad credential never becomes a connection.
pub async fn event_socket_handler(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<SocketQuery>,
) -> Response {
    let token = extract_token(&headers, query.token.as_deref());
    let identity = match app.gate.authenticate(token.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejected event socket handshake: {}", e);
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, identity, app.hub))
}

/// Handle one event socket connection
async fn handle_socket(socket: WebSocket, identity: Identity, hub: HubHandle) {
    let connection = Connection::new(identity);
    let conn_id = connection.conn_id;
    info!(
        "Event socket established for user {} with connection_id: {}",
        connection.user_id(),
        conn_id
    );

    // Register before anything else so broadcasts can reach this socket.
    let (outbound_tx, mut outbound_rx) = unbounded_channel::<ServerEvent>();
    hub.register(connection, outbound_tx);

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Inbound: every text frame becomes a typed command for the hub.
    let inbound_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let event: ClientEvent = match serde_json::from_str(&text) {
                Ok(event) => event,
                Err(e) => {
                    // Malformed frames are dropped, never fatal.
                    error!("Failed to parse event frame from {}: {}", conn_id, e);
                    continue;
                }
            };

            inbound_hub.client_event(conn_id, event);
        }
    });

    // Outbound: drain the hub's channel into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize server event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut recv_task) => send_task.abort(),
        _ = (&mut send_task) => recv_task.abort(),
    };

    // Exactly one teardown, whatever ended the session.
    hub.disconnect(conn_id);
    info!("Event socket closed ({})", conn_id);
}
