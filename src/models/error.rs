use serde::{Deserialize, Serialize};

/// Why a handshake credential was rejected.
///
/// Any of these reject the handshake outright: no connection object and no
/// room state is created for an unauthenticated socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No credential was presented at all.
    Missing,
    /// The credential failed signature or claim validation.
    Invalid,
    /// The credential was well-formed but past its expiry.
    Expired,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Missing => write!(f, "missing credential"),
            AuthError::Invalid => write!(f, "invalid credential"),
            AuthError::Expired => write!(f, "expired credential"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Failure reported by the persistence gateway.
#[derive(Debug, Clone)]
pub enum PersistenceError {
    /// The backing store rejected or lost the operation.
    Store(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Store(msg) => write!(f, "persistence failure: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Response for an error
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}
