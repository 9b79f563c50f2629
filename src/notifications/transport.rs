use crate::config::MailConfig;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, info, warn};
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// A single outbound email. The sender is always the configured account.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub recipient: String,
    /// Provider reply code, e.g. 250
    pub code: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address {0}")]
    InvalidAddress(String),
    #[error("could not build message: {0}")]
    Build(String),
    #[error("mail provider error: {0}")]
    Provider(String),
    #[error("mail transport is closed")]
    Closed,
}

/// The one seam between the handlers and the mail provider.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, DeliveryError>;

    /// Releases the provider channel. Sends after this fail with `Closed`.
    fn close(&self) {}
}

/// Maps well-known provider names to their submission relay; anything else is
/// taken to be a relay host already.
pub fn relay_host(service: &str) -> String {
    match service.trim().to_ascii_lowercase().as_str() {
        "gmail" | "googlemail" => "smtp.gmail.com".to_string(),
        "outlook" | "hotmail" | "live" | "office365" => "smtp.office365.com".to_string(),
        "yahoo" => "smtp.mail.yahoo.com".to_string(),
        "icloud" => "smtp.mail.me.com".to_string(),
        "zoho" => "smtp.zoho.com".to_string(),
        other => other.to_string(),
    }
}

/// SMTP adapter holding one pooled transport for the whole process.
pub struct SmtpMailer {
    sender: Mailbox,
    transport: RwLock<Option<SmtpTransport>>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, DeliveryError> {
        let sender: Mailbox = config
            .account
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(config.account.clone()))?;

        let host = relay_host(&config.service);
        debug!("Creating SMTP transport via {}", host);

        let transport = SmtpTransport::relay(&host)
            .map_err(|e| DeliveryError::Provider(format!("failed to create relay: {}", e)))?
            .credentials(Credentials::new(
                config.account.clone(),
                config.password.clone(),
            ))
            .build();

        info!("Mail transport ready: {} via {}", config.account, host);

        Ok(Self {
            sender,
            transport: RwLock::new(Some(transport)),
        })
    }

    fn build(&self, message: &EmailMessage, message_id: &str) -> Result<Message, DeliveryError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(message.to.clone()))?;

        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(message.subject.as_str())
            .message_id(Some(message_id.to_string()))
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let message_id = format!("<{}@subtrack>", Uuid::new_v4());
        let email = self.build(message, &message_id)?;

        let guard = self.transport.read().map_err(|_| DeliveryError::Closed)?;
        let transport = guard.as_ref().ok_or(DeliveryError::Closed)?;

        let response = transport
            .send(&email)
            .map_err(|e| DeliveryError::Provider(e.to_string()))?;

        Ok(DeliveryReceipt {
            message_id,
            recipient: message.to.clone(),
            code: response.code().to_string(),
        })
    }

    fn close(&self) {
        match self.transport.write() {
            Ok(mut guard) => {
                if guard.take().is_some() {
                    info!("Mail transport closed");
                }
            }
            Err(_) => warn!("Mail transport lock poisoned during shutdown"),
        }
    }
}
