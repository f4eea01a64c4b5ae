//! Signed, stateless email link tokens
//!
//! Token layout: `base64url(purpose|email|expires_unix).base64url(hmac_sha256)`.
//! An expiry of `0` never expires.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Verify,
    Unsubscribe,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Verify => "verify",
            TokenPurpose::Unsubscribe => "unsubscribe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token was issued for a different action")]
    WrongPurpose,

    #[error("token has expired")]
    Expired,

    #[error("invalid signing key")]
    InvalidKey,
}

#[derive(Clone)]
pub struct EmailTokenSigner {
    /// Keyed MAC state, cloned per token
    mac: HmacSha256,
}

impl std::fmt::Debug for EmailTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailTokenSigner").finish_non_exhaustive()
    }
}

impl EmailTokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.as_ref())
            .map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Sign a token for `email`; `ttl` of `None` never expires
    pub fn sign(&self, purpose: TokenPurpose, email: &str, ttl: Option<Duration>) -> String {
        let expires = ttl.map_or(0, |ttl| (Utc::now() + ttl).timestamp().max(1));
        let payload = format!("{}|{}|{}", purpose.as_str(), email, expires);

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Verify a token and return the email it was issued for
    pub fn verify(&self, purpose: TokenPurpose, token: &str) -> Result<String, TokenError> {
        let (payload_b64, signature_b64) =
            token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        // Constant-time comparison
        let mut mac = self.mac.clone();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = String::from_utf8(payload).map_err(|_| TokenError::Malformed)?;
        let mut parts = payload.splitn(3, '|');
        let (Some(token_purpose), Some(email), Some(expires)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        if token_purpose != purpose.as_str() {
            return Err(TokenError::WrongPurpose);
        }

        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        if expires != 0 && expires < Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(email.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> EmailTokenSigner {
        EmailTokenSigner::new("test-secret").unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let token = signer().sign(
            TokenPurpose::Verify,
            "user@example.com",
            Some(Duration::hours(1)),
        );
        assert_eq!(
            signer().verify(TokenPurpose::Verify, &token).unwrap(),
            "user@example.com"
        );
    }

    #[test]
    fn test_wrong_purpose() {
        let token = signer().sign(TokenPurpose::Unsubscribe, "user@example.com", None);
        assert_eq!(
            signer().verify(TokenPurpose::Verify, &token),
            Err(TokenError::WrongPurpose)
        );
    }

    #[test]
    fn test_expired() {
        let token = signer().sign(
            TokenPurpose::Verify,
            "user@example.com",
            Some(Duration::seconds(-10)),
        );
        assert_eq!(
            signer().verify(TokenPurpose::Verify, &token),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_unsubscribe_never_expires() {
        let token = signer().sign(TokenPurpose::Unsubscribe, "user@example.com", None);
        let payload = URL_SAFE_NO_PAD
            .decode(token.split('.').next().unwrap())
            .unwrap();
        assert!(String::from_utf8(payload).unwrap().ends_with("|0"));
        assert!(signer().verify(TokenPurpose::Unsubscribe, &token).is_ok());
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().sign(TokenPurpose::Verify, "user@example.com", None);
        assert_eq!(
            EmailTokenSigner::new("other")
                .unwrap()
                .verify(TokenPurpose::Verify, &token),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = signer().sign(TokenPurpose::Verify, "user@example.com", None);
        let (_, sig) = token.split_once('.').unwrap();
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode("verify|attacker@example.com|0"),
            sig
        );
        assert_eq!(
            signer().verify(TokenPurpose::Verify, &forged),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed() {
        for token in ["", "abc", "a.b.c", "!!!.???"] {
            assert_eq!(
                signer().verify(TokenPurpose::Verify, token),
                Err(TokenError::Malformed),
                "token {token:?}"
            );
        }
    }
}
