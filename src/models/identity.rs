use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of one live socket. A user may hold several at once.
pub type ConnId = Uuid;

/// Role carried inside a verified credential.
///
/// Roles double as broadcast scopes: every connection is auto-joined to
/// `role:<role>` at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Recruiter,
    Candidate,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Recruiter => "recruiter",
            Role::Candidate => "candidate",
            Role::Admin => "admin",
        }
    }

    /// Parse a role claim. Unknown values are rejected at the gate.
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "recruiter" => Some(Role::Recruiter),
            "candidate" => Some(Role::Candidate),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity extracted from a verified credential.
///
/// Attached once at handshake time and trusted for the connection's
/// lifetime; no per-message re-verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

/// A live, authenticated connection.
///
/// Created on successful auth, destroyed on transport close. Owned by the
/// connection registry.
#[derive(Debug, Clone)]
pub struct Connection {
    pub conn_id: ConnId,
    pub identity: Identity,
    pub authenticated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(identity: Identity) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            identity,
            authenticated_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }
}
