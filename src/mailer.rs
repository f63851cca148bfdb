//! Mailer trait and delivery result types.
//!
//! Mailers are stateless with respect to credentials: the provider API key is
//! passed to every [`Mailer::deliver`] call instead of being configured on a
//! shared client. A warm Lambda container can therefore reuse one mailer (and
//! its connection pool) across invocations without carrying a key between them.
//!
//! `#[async_trait]` keeps the trait object safe, so the binary can pick a
//! provider at cold start and hold it as `Box<dyn Mailer>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::email::Email;
use crate::error::NotifyError;
use crate::secrets::SecretValue;

/// Result of a successful email delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID assigned by the provider
    pub message_id: String,
}

impl DeliveryResult {
    /// Create a new delivery result with just a message ID.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// Trait for email delivery providers.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single email, authenticating with `api_key`.
    ///
    /// Returns the message ID on success.
    async fn deliver(&self, email: &Email, api_key: &SecretValue)
        -> Result<DeliveryResult, NotifyError>;

    /// Get the provider name (for logging/debugging).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }
}

#[async_trait]
impl<M: Mailer + ?Sized> Mailer for Box<M> {
    async fn deliver(
        &self,
        email: &Email,
        api_key: &SecretValue,
    ) -> Result<DeliveryResult, NotifyError> {
        (**self).deliver(email, api_key).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}

/// Extension trait for optional mailer operations.
pub trait MailerExt: Mailer {
    /// Validate an email before sending.
    fn validate(&self, email: &Email) -> Result<(), NotifyError> {
        if email.from.is_none() {
            return Err(NotifyError::MissingField("from"));
        }
        if email.to.is_empty() {
            return Err(NotifyError::MissingField("to"));
        }
        Ok(())
    }
}

impl<T: Mailer + ?Sized> MailerExt for T {}
