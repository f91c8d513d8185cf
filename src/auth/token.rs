use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::error;

use crate::models::{AuthError, Identity, Role};

/// Verifies a bearer credential and extracts the identity it carries.
///
/// Swappable so tests can admit identities without minting real tokens;
/// credential issuance itself lives outside this service.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Claims we require from a connection token.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    #[allow(dead_code)]
    exp: usize,
}

/// HS256 JWT verifier.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());

        let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                    _ => {
                        error!("JWT validation failed: {}", e);
                        Err(AuthError::Invalid)
                    }
                };
            }
        };

        // A token with an unknown role claim is as good as no token.
        let role = match Role::parse(&token_data.claims.role) {
            Some(role) => role,
            None => {
                error!("JWT token carries unknown role: {}", token_data.claims.role);
                return Err(AuthError::Invalid);
            }
        };

        Ok(Identity {
            user_id: token_data.claims.sub,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        role: String,
        exp: usize,
    }

    fn mint(secret: &str, sub: &str, role: &str, exp_offset_secs: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset_secs) as usize;
        let claims = TestClaims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_identity() {
        let verifier = JwtVerifier::new("s3cret");
        let token = mint("s3cret", "u-42", "recruiter", 3600);
        let identity = verifier.verify(&token).unwrap();
        assert_eq!(identity.user_id, "u-42");
        assert_eq!(identity.role, Role::Recruiter);
    }

    #[test]
    fn expired_token_is_expired_not_invalid() {
        let verifier = JwtVerifier::new("s3cret");
        let token = mint("s3cret", "u-42", "recruiter", -3600);
        assert_eq!(verifier.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn wrong_signature_is_invalid() {
        let verifier = JwtVerifier::new("s3cret");
        let token = mint("other-secret", "u-42", "recruiter", 3600);
        assert_eq!(verifier.verify(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn unknown_role_is_invalid() {
        let verifier = JwtVerifier::new("s3cret");
        let token = mint("s3cret", "u-42", "superuser", 3600);
        assert_eq!(verifier.verify(&token), Err(AuthError::Invalid));
    }
}
