//! Outbound subscription emails.
//!
//! Delivery is best-effort: callers record the outcome next to the mutation
//! they already committed and never roll it back on failure.

pub mod templates;
pub mod transport;

pub use transport::{DeliveryError, DeliveryReceipt, EmailMessage, MailTransport, SmtpMailer};

use actix_web::web;
use serde::Serialize;

/// Outcome of a notification, reported back to the API caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationStatus {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationStatus {
    pub fn skipped() -> Self {
        Self {
            sent: false,
            error: None,
        }
    }
}

/// Sends `message` on the blocking pool and logs the result.
pub async fn deliver(mailer: web::Data<dyn MailTransport>, message: EmailMessage) -> NotificationStatus {
    let recipient = message.to.clone();
    let subject = message.subject.clone();

    let result = web::block(move || mailer.send(&message)).await;

    match result {
        Ok(Ok(receipt)) => {
            tracing::info!(
                recipient = %receipt.recipient,
                message_id = %receipt.message_id,
                code = %receipt.code,
                "Sent \"{}\"",
                subject
            );
            NotificationStatus {
                sent: true,
                error: None,
            }
        }
        Ok(Err(err)) => {
            tracing::error!(recipient = %recipient, error = %err, "Failed to send \"{}\"", subject);
            NotificationStatus {
                sent: false,
                error: Some(err.to_string()),
            }
        }
        Err(err) => {
            tracing::error!(recipient = %recipient, error = %err, "Mail task did not complete");
            NotificationStatus {
                sent: false,
                error: Some("mail task did not complete".to_string()),
            }
        }
    }
}
