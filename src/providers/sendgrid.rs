//! SendGrid API provider.
//!
//! ```rust,ignore
//! use pipeline_alerts::providers::SendGridMailer;
//! use pipeline_alerts::secrets::SecretValue;
//!
//! let mailer = SendGridMailer::new();
//! mailer.deliver(&email, &SecretValue::new("SG.xxxxx")).await?;
//! ```

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::email::Email;
use crate::error::NotifyError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::secrets::SecretValue;

/// Default SendGrid v3 API endpoint.
pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3";

/// SendGrid API email provider.
///
/// Holds only the HTTP client and endpoint; the API key arrives with each
/// delivery.
pub struct SendGridMailer {
    client: Client,
    base_url: String,
    compress: bool,
}

impl SendGridMailer {
    /// Create a new SendGrid mailer.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: SENDGRID_API_URL.to_string(),
            compress: false,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Enable gzip compression for requests.
    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    fn build_request(&self, email: &Email) -> Result<SendGridRequest, NotifyError> {
        let from = email.from.as_ref().ok_or(NotifyError::MissingField("from"))?;
        if email.to.is_empty() {
            return Err(NotifyError::MissingField("to"));
        }

        let mut content = Vec::new();
        if let Some(ref text) = email.text_body {
            content.push(SendGridContent {
                content_type: "text/plain".to_string(),
                value: text.clone(),
            });
        }
        if let Some(ref html) = email.html_body {
            content.push(SendGridContent {
                content_type: "text/html".to_string(),
                value: html.clone(),
            });
        }

        Ok(SendGridRequest {
            personalizations: vec![SendGridPersonalization {
                to: email
                    .to
                    .iter()
                    .map(|a| SendGridAddress {
                        email: a.email.clone(),
                        name: a.name.clone(),
                    })
                    .collect(),
            }],
            from: SendGridAddress {
                email: from.email.clone(),
                name: from.name.clone(),
            },
            subject: email.subject.clone(),
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
        })
    }

    fn compress_body(&self, body: &[u8]) -> Result<Vec<u8>, NotifyError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).map_err(|e| {
            NotifyError::provider("sendgrid", format!("Failed to compress body: {}", e))
        })?;
        encoder.finish().map_err(|e| {
            NotifyError::provider("sendgrid", format!("Failed to finish compression: {}", e))
        })
    }
}

impl Default for SendGridMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn deliver(
        &self,
        email: &Email,
        api_key: &SecretValue,
    ) -> Result<DeliveryResult, NotifyError> {
        let request = self.build_request(email)?;

        let url = format!("{}/mail/send", self.base_url);
        let json_body = serde_json::to_vec(&request)?;

        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose()))
            .header("Content-Type", "application/json")
            .header("User-Agent", format!("pipeline-alerts/{}", crate::VERSION));

        let body = if self.compress {
            req = req.header("Content-Encoding", "gzip");
            self.compress_body(&json_body)?
        } else {
            json_body
        };

        let response = req.body(body).send().await?;
        let status = response.status();

        // SendGrid returns 202 Accepted on success with no body
        if status.is_success() {
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            Ok(DeliveryResult::new(message_id))
        } else {
            let error: SendGridError = response.json().await.unwrap_or(SendGridError {
                errors: vec![SendGridErrorDetail {
                    message: "Unknown error".to_string(),
                    field: None,
                    help: None,
                }],
            });

            let error_msg = error
                .errors
                .iter()
                .map(|e| match e.field {
                    Some(ref field) => format!("{} (field: {})", e.message, field),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");

            Err(NotifyError::provider_with_status(
                "sendgrid",
                error_msg,
                status.as_u16(),
            ))
        }
    }

    fn provider_name(&self) -> &'static str {
        "sendgrid"
    }
}

// ============================================================================
// SendGrid API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<SendGridPersonalization>,
    from: SendGridAddress,
    subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<Vec<SendGridContent>>,
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization {
    to: Vec<SendGridAddress>,
}

#[derive(Debug, Serialize)]
struct SendGridAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendGridContent {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SendGridError {
    errors: Vec<SendGridErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct SendGridErrorDetail {
    message: String,
    field: Option<String>,
    #[allow(dead_code)]
    help: Option<String>,
}
