//! Email delivery channels.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::message::OutboundEmail;
use super::MailError;

/// Submits composed emails to an external delivery service.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Submit `email`, returning the provider's message identifier.
    async fn send(&self, email: &OutboundEmail) -> Result<String, MailError>;

    /// Check that the channel is configured and reachable.
    async fn check_connection(&self) -> Result<(), MailError>;
}

/// Brevo transactional email HTTP API.
pub struct BrevoTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct BrevoAddress<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

#[derive(Serialize)]
struct BrevoAttachment<'a> {
    name: &'a str,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmail<'a> {
    sender: BrevoAddress<'a>,
    to: Vec<BrevoAddress<'a>>,
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachment: Vec<BrevoAttachment<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendResponse {
    message_id: String,
}

impl<'a> From<&'a OutboundEmail> for BrevoEmail<'a> {
    fn from(email: &'a OutboundEmail) -> Self {
        Self {
            sender: BrevoAddress {
                name: Some(&email.sender.name),
                email: &email.sender.email,
            },
            to: vec![BrevoAddress {
                name: None,
                email: &email.to,
            }],
            subject: &email.subject,
            html_content: &email.html_body,
            text_content: &email.text_body,
            attachment: email
                .attachments
                .iter()
                .map(|a| BrevoAttachment {
                    name: &a.filename,
                    content: STANDARD.encode(&a.content),
                })
                .collect(),
        }
    }
}

impl BrevoTransport {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str, MailError> {
        self.api_key.as_deref().ok_or(MailError::MissingApiKey)
    }
}

#[async_trait]
impl EmailTransport for BrevoTransport {
    fn name(&self) -> &str {
        "Brevo"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<String, MailError> {
        let api_key = self.api_key()?;
        let payload = BrevoEmail::from(email);

        let response = self
            .client
            .post(format!("{}/smtp/email", self.api_url))
            .header("accept", "application/json")
            .header("api-key", api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BrevoSendResponse = response.json().await?;
        Ok(parsed.message_id)
    }

    async fn check_connection(&self) -> Result<(), MailError> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}/account", self.api_url))
            .header("accept", "application/json")
            .header("api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(MailError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
