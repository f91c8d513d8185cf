//! Real-time collaboration and presence for live interviews: presence
//! tracking, room-scoped broadcast, WebRTC signaling relay and
//! conflict-free collaborative editing of shared interview notes.

pub mod auth;
pub mod collab;
pub mod config;
pub mod db;
pub mod handlers;
pub mod hub;
pub mod models;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use auth::AuthGate;
use hub::HubHandle;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub gate: Arc<AuthGate>,
}
