use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{diagnostics, health_check, push_notification, ready_check};
use crate::ws::{event_socket_handler, sync_socket_handler};
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health_check))
        .route("/v1/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/notifications", post(push_notification))
        .with_state(state)
}

/// Create the two socket surfaces: the event protocol and the raw
/// document-sync protocol.
pub fn create_socket_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(event_socket_handler))
        .route("/sync/:note_id", get(sync_socket_handler))
        .with_state(state)
}
