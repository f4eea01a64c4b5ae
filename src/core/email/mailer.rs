use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::{EmailError, mask_email};
use crate::config::EmailConfig;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// Build the mailer for the configuration: SMTP when a host is set, logging otherwise
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, EmailError> {
    match config.smtp_host.as_deref().filter(|h| !h.is_empty()) {
        Some(host) => Ok(Arc::new(SmtpMailer::new(config, host)?)),
        None => {
            tracing::info!("SMTP not configured, emails will be logged instead of sent");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Delivers mail through an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
    port: u16,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig, host: &str) -> Result<Self, EmailError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| EmailError::Send(format!("Invalid from address: {e}")))?;

        // 465 is implicit TLS, local relays (mailpit, mailhog) run without TLS,
        // everything else upgrades with STARTTLS
        let mut builder = if host == "localhost" || host == "127.0.0.1" {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(|e| {
                EmailError::Send(format!("Failed to create SMTP transport: {e}"))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|e| {
                EmailError::Send(format!("Failed to create SMTP transport: {e}"))
            })?
        };

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.port(config.smtp_port).build(),
            from,
            host: host.to_string(),
            port: config.smtp_port,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("Invalid recipient: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )
            .map_err(|e| EmailError::Send(format!("Failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::Send(format!("Failed to send email: {e}")))?;

        tracing::info!(
            to = %mask_email(&email.to),
            host = %self.host,
            port = self.port,
            "Email sent via SMTP"
        );
        Ok(())
    }
}

/// Development mailer: logs the message and reports success
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %mask_email(&email.to),
            subject = %email.subject,
            body = %email.text,
            "SMTP not configured, email logged instead of sent"
        );
        Ok(())
    }
}
