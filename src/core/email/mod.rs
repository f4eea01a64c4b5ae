//! Email verification and unsubscribe links

mod mailer;
mod service;
mod tokens;

use thiserror::Error;

use crate::core::store::StoreError;

pub use mailer::{LogMailer, Mailer, OutgoingEmail, SmtpMailer, mailer_from_config};
pub use service::{
    EMAIL_VERIFICATIONS_COLLECTION, EmailService, UNSUBSCRIBES_COLLECTION, email_document_id,
    normalize_email,
};
pub use tokens::{EmailTokenSigner, TokenError, TokenPurpose};

#[derive(Debug, Error)]
pub enum EmailError {
    /// No token secret configured
    #[error("email links are not configured")]
    NotConfigured,

    #[error("{0}")]
    InvalidAddress(String),

    #[error("address has unsubscribed")]
    Unsubscribed,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Send(String),
}

/// Mask an email address for safe logging: `use***@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(3).collect();
            format!("{visible}***@{domain}")
        }
        None => "***".to_string(),
    }
}
