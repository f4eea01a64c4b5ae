//! Request authentication primitives
//!
//! Dashboard callers authenticate either with a static API secret (the secret's id is the
//! owner id) or with an HS256 session JWT whose `sub` claim is the owner id.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::AuthApiSecret;
use crate::errors::auth_error::AuthError;

/// Owner id used when authentication is disabled
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Authentication context inserted into request extensions by `auth_middleware`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    pub id: Option<String>,
}

impl Auth {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    /// Context for requests served while authentication is disabled
    pub fn empty() -> Self {
        Self { id: None }
    }

    /// Owner id that scopes every project lookup
    pub fn owner_id(&self) -> &str {
        self.id.as_deref().unwrap_or(ANONYMOUS_OWNER)
    }
}

/// Find the id of the API secret matching `token`.
///
/// Every configured secret is compared in constant time so the response time does not
/// reveal which prefix matched.
pub fn match_api_secret_id<'a>(token: &str, secrets: &'a [AuthApiSecret]) -> Option<&'a str> {
    let mut matched = None;
    for entry in secrets {
        if bool::from(token.as_bytes().ct_eq(entry.secret.as_bytes())) && matched.is_none() {
            matched = Some(entry.id.as_str());
        }
    }
    matched
}

/// Claims carried by dashboard session tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Owner id
    pub sub: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Verify an HS256 session token and return its claims
pub fn verify_session_jwt(token: &str, secret: &str) -> Result<SessionClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);

    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::Unauthorized(format!("Invalid session token: {e}")),
    })
}

/// Issue an HS256 session token; the dashboard login flow and tests use this
pub fn issue_session_jwt(claims: &SessionClaims, secret: &str) -> Result<String, AuthError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::ConfigError(format!("Failed to sign session token: {e}")))
}
