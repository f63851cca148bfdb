//! Local mailer for development and testing.
//!
//! Captures emails in memory, along with the key each one was delivered
//! with, for programmatic assertions in tests.
//!
//! ```rust,ignore
//! use pipeline_alerts::providers::LocalMailer;
//! use pipeline_alerts::testing::*;
//!
//! let mailer = LocalMailer::new();
//! // ... run the notifier with `mailer.clone()` ...
//! assert_email_sent(&mailer);
//! assert_email_subject_contains(&mailer, "FAILED");
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::email::Email;
use crate::error::NotifyError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::secrets::SecretValue;

/// A captured email with metadata.
#[derive(Debug, Clone)]
pub struct StoredEmail {
    /// Identifier returned as the message ID.
    pub id: String,
    /// The email content.
    pub email: Email,
    /// Key passed to `deliver`.
    pub api_key: SecretValue,
    /// When the email was captured.
    pub sent_at: DateTime<Utc>,
}

/// Local mailer that stores emails in memory.
///
/// Clones share storage, so a test can keep one handle and give the other
/// to the code under test.
#[derive(Clone, Default)]
pub struct LocalMailer {
    emails: Arc<Mutex<Vec<StoredEmail>>>,
    /// If set, deliver() will return this error (for testing error paths).
    fail_with: Arc<RwLock<Option<String>>>,
}

impl LocalMailer {
    /// Create a new local mailer with fresh storage.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Failure Simulation (for testing)
    // =========================================================================

    /// Configure the mailer to fail with an error message.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }

    /// Clear the failure state.
    pub fn clear_failure(&self) {
        *self.fail_with.write() = None;
    }

    // =========================================================================
    // Email Access (for testing assertions)
    // =========================================================================

    /// Get all captured emails, in delivery order.
    pub fn emails(&self) -> Vec<StoredEmail> {
        self.emails.lock().clone()
    }

    /// Get the most recently sent email.
    pub fn last_email(&self) -> Option<StoredEmail> {
        self.emails.lock().last().cloned()
    }

    /// Get the count of sent emails.
    pub fn email_count(&self) -> usize {
        self.emails.lock().len()
    }

    /// Check if any email was sent.
    pub fn has_emails(&self) -> bool {
        self.email_count() > 0
    }

    /// Clear all captured emails.
    pub fn clear(&self) {
        self.emails.lock().clear();
    }

    /// Remove and return all captured emails.
    pub fn flush(&self) -> Vec<StoredEmail> {
        std::mem::take(&mut *self.emails.lock())
    }

    /// Find emails matching a predicate.
    pub fn find_emails<F>(&self, predicate: F) -> Vec<StoredEmail>
    where
        F: Fn(&Email) -> bool,
    {
        self.emails
            .lock()
            .iter()
            .filter(|stored| predicate(&stored.email))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for LocalMailer {
    async fn deliver(
        &self,
        email: &Email,
        api_key: &SecretValue,
    ) -> Result<DeliveryResult, NotifyError> {
        if let Some(ref message) = *self.fail_with.read() {
            return Err(NotifyError::provider("local", message.clone()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.emails.lock().push(StoredEmail {
            id: id.clone(),
            email: email.clone(),
            api_key: api_key.clone(),
            sent_at: Utc::now(),
        });

        Ok(DeliveryResult::new(id))
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
