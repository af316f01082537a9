//! Mailer module - emails generated certificates to their owners.
//!
//! `Mailer::send_certificate` never returns an error: every failure is folded
//! into a [`DeliveryOutcome`] so the caller can log it and move on.

pub mod message;
pub mod transport;

pub use message::{Mailbox, OutboundEmail};
pub use transport::{BrevoTransport, EmailTransport};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::MailConfig;

const FAILURE_NOTE: &str = "Certificate was generated successfully";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("BREVO_API_KEY not set in environment variables")]
    MissingApiKey,
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("email sending timed out after {0:?}")]
    Timeout(Duration),
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl DeliveryOutcome {
    pub fn sent(recipient: &str, message_id: String, via: &str) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
            recipient: recipient.to_string(),
            timestamp: Utc::now(),
            note: None,
            via: Some(via.to_string()),
        }
    }

    pub fn failed(recipient: &str, error: impl ToString) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.to_string()),
            recipient: recipient.to_string(),
            timestamp: Utc::now(),
            note: Some(FAILURE_NOTE.to_string()),
            via: None,
        }
    }
}

/// Composes certificate emails and submits them through a transport.
pub struct Mailer {
    transport: Arc<dyn EmailTransport>,
    sender: Mailbox,
    timeout: Duration,
}

impl Mailer {
    pub fn new(transport: Arc<dyn EmailTransport>, sender: Mailbox, timeout: Duration) -> Self {
        Self {
            transport,
            sender,
            timeout,
        }
    }

    /// Mailer sending through the Brevo API as configured.
    pub fn from_config(config: &MailConfig, client: reqwest::Client) -> Self {
        let transport = Arc::new(BrevoTransport::new(
            client,
            config.api_url.clone(),
            config.api_key.clone(),
        ));
        Self::new(
            transport,
            Mailbox {
                name: config.sender_name.clone(),
                email: config.sender_email.clone(),
            },
            config.timeout,
        )
    }

    /// Email the certificate to `to`. Failures come back as an unsuccessful outcome.
    pub async fn send_certificate(&self, to: &str, pdf: &[u8], preview: &[u8]) -> DeliveryOutcome {
        log::info!(
            "Sending certificate to {} via {} (PDF {} KB)",
            to,
            self.transport.name(),
            pdf.len() / 1024
        );

        let email = message::compose_certificate_email(&self.sender, to, pdf, preview, Utc::now());
        let result = match tokio::time::timeout(self.timeout, self.transport.send(&email)).await {
            Ok(result) => result,
            Err(_) => Err(MailError::Timeout(self.timeout)),
        };

        match result {
            Ok(message_id) => {
                log::info!("Email sent to {} (message id {})", to, message_id);
                DeliveryOutcome::sent(to, message_id, self.transport.name())
            }
            Err(e) => {
                log::error!("Email to {} failed: {}", to, e);
                DeliveryOutcome::failed(to, e)
            }
        }
    }

    /// Advisory connectivity check. Logs the result and never fails.
    pub async fn precheck(&self) -> bool {
        log::info!("Testing email connection ({})", self.transport.name());
        match tokio::time::timeout(self.timeout, self.transport.check_connection()).await {
            Ok(Ok(())) => {
                log::info!("Email channel {} is reachable", self.transport.name());
                true
            }
            Ok(Err(e)) => {
                log::warn!("Email channel check failed: {}", e);
                false
            }
            Err(_) => {
                log::warn!("Email channel check timed out after {:?}", self.timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    enum Behaviour {
        Accept,
        Reject,
        Hang,
    }

    struct StubTransport {
        behaviour: Behaviour,
        sent: Mutex<Vec<OutboundEmail>>,
    }

    impl StubTransport {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl EmailTransport for StubTransport {
        fn name(&self) -> &str {
            "stub"
        }

        async fn send(&self, email: &OutboundEmail) -> Result<String, MailError> {
            match self.behaviour {
                Behaviour::Accept => {
                    self.sent.lock().push(email.clone());
                    Ok("<msg-1@stub>".to_string())
                }
                Behaviour::Reject => Err(MailError::Api {
                    status: 401,
                    body: "{\"code\":\"unauthorized\"}".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("late".to_string())
                }
            }
        }

        async fn check_connection(&self) -> Result<(), MailError> {
            match self.behaviour {
                Behaviour::Accept => Ok(()),
                _ => Err(MailError::MissingApiKey),
            }
        }
    }

    fn mailer(transport: Arc<StubTransport>, timeout: Duration) -> Mailer {
        Mailer::new(
            transport,
            Mailbox {
                name: "Certificate System".to_string(),
                email: "certificates@example.com".to_string(),
            },
            timeout,
        )
    }

    #[tokio::test]
    async fn test_successful_delivery() {
        let transport = StubTransport::new(Behaviour::Accept);
        let outcome = mailer(transport.clone(), Duration::from_secs(1))
            .send_certificate("jane@example.com", b"%PDF-1.4", &[b'x'; 200])
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message_id.as_deref(), Some("<msg-1@stub>"));
        assert_eq!(outcome.recipient, "jane@example.com");
        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments.len(), 2);
    }

    #[tokio::test]
    async fn test_api_error_becomes_outcome() {
        let transport = StubTransport::new(Behaviour::Reject);
        let outcome = mailer(transport, Duration::from_secs(1))
            .send_certificate("jane@example.com", b"%PDF-1.4", b"")
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("401"));
        assert_eq!(outcome.note.as_deref(), Some(FAILURE_NOTE));
    }

    #[tokio::test]
    async fn test_timeout_becomes_outcome() {
        let transport = StubTransport::new(Behaviour::Hang);
        let outcome = mailer(transport, Duration::from_millis(20))
            .send_certificate("jane@example.com", b"%PDF-1.4", b"")
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_precheck_never_fails() {
        let healthy = mailer(StubTransport::new(Behaviour::Accept), Duration::from_secs(1));
        assert!(healthy.precheck().await);

        let broken = mailer(StubTransport::new(Behaviour::Reject), Duration::from_secs(1));
        assert!(!broken.precheck().await);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = DeliveryOutcome::failed("jane@example.com", MailError::MissingApiKey);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "BREVO_API_KEY not set in environment variables");
        assert!(json.get("messageId").is_none());
    }
}
