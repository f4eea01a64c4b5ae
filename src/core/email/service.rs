use std::sync::Arc;

use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use super::{EmailError, EmailTokenSigner, Mailer, OutgoingEmail, TokenPurpose, mask_email};
use crate::core::store::{Document, DocumentStore};

pub const EMAIL_VERIFICATIONS_COLLECTION: &str = "email_verifications";
pub const UNSUBSCRIBES_COLLECTION: &str = "unsubscribes";

const MAX_EMAIL_CHARS: usize = 254;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@|]+@[^\s@|]+\.[^\s@|]+$").expect("valid email regex"));

/// Trim, lowercase and sanity-check an address
pub fn normalize_email(raw: &str) -> Result<String, EmailError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || email.len() > MAX_EMAIL_CHARS || !EMAIL_RE.is_match(&email) {
        return Err(EmailError::InvalidAddress(format!(
            "'{}' is not a valid email address",
            raw.trim()
        )));
    }
    Ok(email)
}

/// Document id for per-address records: hex SHA-256 of the normalized address
pub fn email_document_id(email: &str) -> String {
    hex::encode(Sha256::digest(email.trim().to_lowercase().as_bytes()))
}

/// Verification and unsubscribe flows over signed links
#[derive(Clone)]
pub struct EmailService {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
    signer: Option<EmailTokenSigner>,
    public_base_url: String,
    verification_ttl: Duration,
}

impl EmailService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        signer: Option<EmailTokenSigner>,
        public_base_url: impl Into<String>,
        verification_ttl: Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            signer,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            verification_ttl,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.signer.is_some()
    }

    fn signer(&self) -> Result<&EmailTokenSigner, EmailError> {
        self.signer.as_ref().ok_or(EmailError::NotConfigured)
    }

    fn unsubscribe_link(&self, signer: &EmailTokenSigner, email: &str) -> String {
        let token = signer.sign(TokenPurpose::Unsubscribe, email, None);
        format!("{}/api/email/unsubscribe?token={token}", self.public_base_url)
    }

    /// Send a verification link, recording the pending request
    pub async fn send_verification(&self, raw_email: &str) -> Result<String, EmailError> {
        let signer = self.signer()?;
        let email = normalize_email(raw_email)?;

        if self.is_unsubscribed(&email).await? {
            tracing::info!(
                email = %mask_email(&email),
                "Skipping verification for unsubscribed address"
            );
            return Err(EmailError::Unsubscribed);
        }

        let token = signer.sign(TokenPurpose::Verify, &email, Some(self.verification_ttl));
        let verify_link = format!("{}/api/email/verify?token={token}", self.public_base_url);
        let unsubscribe_link = self.unsubscribe_link(signer, &email);

        let mut record = Document::new();
        record.insert("email".to_string(), Value::from(email.clone()));
        record.insert("verified".to_string(), Value::Bool(false));
        record.insert("requestedAt".to_string(), json!(Utc::now()));
        self.store
            .set(EMAIL_VERIFICATIONS_COLLECTION, &email_document_id(&email), record)
            .await?;

        let hours = self.verification_ttl.num_hours();
        let message = OutgoingEmail {
            to: email.clone(),
            subject: "Confirm your email address".to_string(),
            text: format!(
                "Confirm your email address for PitchVoice by opening this link:\n\n{verify_link}\n\n\
                 The link expires in {hours} hours.\n\n\
                 Don't want these emails? Unsubscribe: {unsubscribe_link}\n"
            ),
            html: format!(
                "<p>Confirm your email address for PitchVoice:</p>\
                 <p><a href=\"{verify_link}\">Verify email</a></p>\
                 <p>The link expires in {hours} hours.</p>\
                 <p style=\"font-size:12px;color:#888\">Don't want these emails? \
                 <a href=\"{unsubscribe_link}\">Unsubscribe</a></p>"
            ),
        };
        self.mailer.send(&message).await?;

        tracing::info!(email = %mask_email(&email), "Verification email sent");
        Ok(email)
    }

    /// Mark the address in a verification token as verified
    pub async fn confirm_verification(&self, token: &str) -> Result<String, EmailError> {
        let email = self.signer()?.verify(TokenPurpose::Verify, token)?;

        let id = email_document_id(&email);
        let mut record = self
            .store
            .get(EMAIL_VERIFICATIONS_COLLECTION, &id)
            .await?
            .unwrap_or_default();
        record.insert("email".to_string(), Value::from(email.clone()));
        record.insert("verified".to_string(), Value::Bool(true));
        record.insert("verifiedAt".to_string(), json!(Utc::now()));
        self.store
            .set(EMAIL_VERIFICATIONS_COLLECTION, &id, record)
            .await?;

        tracing::info!(email = %mask_email(&email), "Email verified");
        Ok(email)
    }

    /// Record an unsubscribe; repeating it is harmless
    pub async fn unsubscribe(&self, token: &str) -> Result<String, EmailError> {
        let email = self.signer()?.verify(TokenPurpose::Unsubscribe, token)?;

        let mut record = Document::new();
        record.insert("email".to_string(), Value::from(email.clone()));
        record.insert("unsubscribedAt".to_string(), json!(Utc::now()));
        self.store
            .set(UNSUBSCRIBES_COLLECTION, &email_document_id(&email), record)
            .await?;

        tracing::info!(email = %mask_email(&email), "Address unsubscribed");
        Ok(email)
    }

    pub async fn is_unsubscribed(&self, email: &str) -> Result<bool, EmailError> {
        Ok(self
            .store
            .get(UNSUBSCRIBES_COLLECTION, &email_document_id(email))
            .await?
            .is_some())
    }

    /// Whether the address completed verification
    pub async fn is_verified(&self, email: &str) -> Result<bool, EmailError> {
        let record = self
            .store
            .get(EMAIL_VERIFICATIONS_COLLECTION, &email_document_id(email))
            .await?;
        Ok(record
            .and_then(|doc| doc.get("verified").and_then(Value::as_bool))
            .unwrap_or(false))
    }
}
