use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// A server-initiated notification, delivered as `notification:new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub message: String,
    // Named `kind` on the wire: the frame envelope already owns `type`.
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: &str, message: &str, kind: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            kind: kind.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Where a notification goes: one user's connections, one role, or everyone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scope", content = "value", rename_all = "lowercase")]
pub enum NotificationTarget {
    User(String),
    Role(Role),
    All,
}
