use axum::http::{header, HeaderMap};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::token::TokenVerifier;
use crate::models::{AuthError, Identity};

/// Gates every inbound connection before it exists anywhere else.
///
/// A rejected handshake leaves no trace: no connection object, no room
/// state, no presence entry.
pub struct AuthGate {
    verifier: Arc<dyn TokenVerifier>,
    // Verified-identity cache. Time-to-live is kept well below any sane
    // token lifetime so an expired token cannot ride a stale cache entry.
    identities: Cache<String, Identity>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            identities: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(60))
                .build(),
        }
    }

    /// Verify a handshake credential and extract the identity it carries.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let token = match credential {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AuthError::Missing),
        };

        if let Some(identity) = self.identities.get(token) {
            return Ok(identity);
        }

        let identity = self.verifier.verify(token)?;
        info!("Credential verified for user: {}", identity.user_id);

        self.identities.insert(token.to_string(), identity.clone());
        Ok(identity)
    }
}

/// Pull the bearer token out of a handshake request.
///
/// 1. `Authorization: Bearer` header
/// 2. `auth_token` cookie
/// 3. `token` query parameter (browser WebSocket clients cannot set headers)
pub fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    // 1. Try to get the token from the Authorization header
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            return Some(
                auth_str
                    .strip_prefix("Bearer ")
                    .unwrap_or(auth_str)
                    .to_string(),
            );
        }
        return None;
    }

    // 2. Try to get the token from cookies
    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie::Cookie::split_parse(cookie_str).flatten() {
                if cookie.name() == "auth_token" {
                    return Some(cookie.value().to_string());
                }
            }
        }
    }

    // 3. Fall back to the connection URL
    query_token.map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    struct StaticVerifier;

    impl TokenVerifier for StaticVerifier {
        fn verify(&self, token: &str) -> Result<Identity, AuthError> {
            match token {
                "good" => Ok(Identity {
                    user_id: "u-1".into(),
                    role: Role::Candidate,
                }),
                "stale" => Err(AuthError::Expired),
                _ => Err(AuthError::Invalid),
            }
        }
    }

    #[test]
    fn missing_credential_is_rejected() {
        let gate = AuthGate::new(Arc::new(StaticVerifier));
        assert_eq!(gate.authenticate(None), Err(AuthError::Missing));
        assert_eq!(gate.authenticate(Some("")), Err(AuthError::Missing));
    }

    #[test]
    fn expired_credential_is_rejected() {
        let gate = AuthGate::new(Arc::new(StaticVerifier));
        assert_eq!(gate.authenticate(Some("stale")), Err(AuthError::Expired));
    }

    #[test]
    fn valid_credential_yields_identity() {
        let gate = AuthGate::new(Arc::new(StaticVerifier));
        let identity = gate.authenticate(Some("good")).unwrap();
        assert_eq!(identity.user_id, "u-1");
    }

    #[test]
    fn header_wins_over_query_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(
            extract_token(&headers, Some("from-query")),
            Some("abc".to_string())
        );
        assert_eq!(
            extract_token(&HeaderMap::new(), Some("from-query")),
            Some("from-query".to_string())
        );
    }

    #[test]
    fn cookie_token_is_found() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; auth_token=tok123".parse().unwrap(),
        );
        assert_eq!(extract_token(&headers, None), Some("tok123".to_string()));
    }
}
