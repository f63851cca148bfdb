//! Assertion helpers for alerts captured by [`LocalMailer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pipeline_alerts::providers::LocalMailer;
//! use pipeline_alerts::testing::*;
//!
//! #[tokio::test]
//! async fn test_failed_build_alert() {
//!     let mailer = LocalMailer::new();
//!
//!     // ... run a notifier built with `mailer.clone()` ...
//!
//!     assert_email_sent(&mailer);
//!     assert_email_to(&mailer, "developer@example.com");
//!     assert_email_subject_contains(&mailer, "FAILED failed");
//!     assert_email_body_contains(&mailer, "Follow in Cloudwatch");
//!     assert_api_key(&mailer, "SG.test");
//! }
//! ```

use crate::email::Email;
use crate::providers::{LocalMailer, StoredEmail};

// ============================================================================
// Helper Functions
// ============================================================================

/// Format a list of emails for error messages.
fn format_email_summary(emails: &[StoredEmail]) -> String {
    if emails.is_empty() {
        return "  (no emails sent)".to_string();
    }

    emails
        .iter()
        .enumerate()
        .map(|(i, stored)| {
            let e = &stored.email;
            let to = e
                .to
                .iter()
                .map(|a| a.email.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {}. To: [{}], Subject: \"{}\"", i + 1, to, e.subject)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn body(email: &Email) -> &str {
    email
        .html_body
        .as_deref()
        .or(email.text_body.as_deref())
        .unwrap_or("")
}

// ============================================================================
// Basic Assertions
// ============================================================================

/// Assert that at least one email was sent.
///
/// # Panics
///
/// Panics if no emails were sent.
pub fn assert_email_sent(mailer: &LocalMailer) {
    assert!(
        mailer.has_emails(),
        "Expected at least one email to be sent, but none were sent"
    );
}

/// Assert that no emails were sent.
///
/// # Panics
///
/// Panics if any email was sent.
pub fn assert_no_emails_sent(mailer: &LocalMailer) {
    let emails = mailer.emails();
    assert!(
        emails.is_empty(),
        "Expected no emails to be sent, but {} were sent.\n\nEmails sent:\n{}",
        emails.len(),
        format_email_summary(&emails)
    );
}

/// Assert that exactly N emails were sent.
///
/// # Panics
///
/// Panics if the count doesn't match.
pub fn assert_email_count(mailer: &LocalMailer, expected: usize) {
    let actual = mailer.email_count();
    assert!(
        actual == expected,
        "Expected {} email(s) to be sent, but {} were sent.\n\nEmails sent:\n{}",
        expected,
        actual,
        format_email_summary(&mailer.emails())
    );
}

/// Assert that an email was sent to a specific address.
///
/// # Panics
///
/// Panics if no email was sent to the address.
pub fn assert_email_to(mailer: &LocalMailer, email: &str) {
    let emails = mailer.emails();
    let found = emails
        .iter()
        .any(|stored| stored.email.to.iter().any(|a| a.email.eq_ignore_ascii_case(email)));

    assert!(
        found,
        "Expected an email to be sent to '{}'.\n\nEmails sent:\n{}",
        email,
        format_email_summary(&emails)
    );
}

/// Assert that an email with the exact subject was sent.
///
/// # Panics
///
/// Panics if no email with the subject was found.
pub fn assert_email_subject(mailer: &LocalMailer, subject: &str) {
    let emails = mailer.emails();
    let found = emails.iter().any(|stored| stored.email.subject == subject);

    assert!(
        found,
        "Expected an email with subject '{}'.\n\nEmails sent:\n{}",
        subject,
        format_email_summary(&emails)
    );
}

/// Assert that an email with subject containing text was sent.
///
/// # Panics
///
/// Panics if no matching email was found.
pub fn assert_email_subject_contains(mailer: &LocalMailer, text: &str) {
    let emails = mailer.emails();
    let found = emails.iter().any(|stored| stored.email.subject.contains(text));

    assert!(
        found,
        "Expected an email with subject containing '{}'.\n\nEmails sent:\n{}",
        text,
        format_email_summary(&emails)
    );
}

/// Assert that an email matching a predicate was sent.
///
/// # Panics
///
/// Panics if no matching email was found.
pub fn assert_email_matches<F>(mailer: &LocalMailer, predicate: F)
where
    F: Fn(&Email) -> bool,
{
    let matches = mailer.find_emails(predicate);
    assert!(
        !matches.is_empty(),
        "Expected an email matching the predicate, but none was found.\n\nEmails sent:\n{}",
        format_email_summary(&mailer.emails())
    );
}

// ============================================================================
// Last Email
// ============================================================================

/// Get the last email sent, or panic if none.
///
/// # Panics
///
/// Panics if no emails were sent.
pub fn get_last_email(mailer: &LocalMailer) -> StoredEmail {
    mailer
        .last_email()
        .expect("Expected at least one email to be sent, but none were sent")
}

/// Assert the last email's body (HTML, else text) contains text.
///
/// # Panics
///
/// Panics if no email was sent or the body doesn't contain text.
pub fn assert_email_body_contains(mailer: &LocalMailer, text: &str) {
    let last = get_last_email(mailer);
    let body = body(&last.email);

    assert!(
        body.contains(text),
        "Expected body to contain '{}', but it didn't.\n\nLast email:\n{}\n\nBody:\n{}",
        text,
        format_email_summary(std::slice::from_ref(&last)),
        body
    );
}

/// Assert the last email's body does not contain text.
///
/// # Panics
///
/// Panics if no email was sent or the body contains text.
pub fn refute_email_body_contains(mailer: &LocalMailer, text: &str) {
    let last = get_last_email(mailer);
    let body = body(&last.email);

    assert!(
        !body.contains(text),
        "Expected body not to contain '{}'.\n\nBody:\n{}",
        text,
        body
    );
}

/// Assert the last email was delivered with the given provider key.
///
/// # Panics
///
/// Panics if no email was sent or a different key was used.
pub fn assert_api_key(mailer: &LocalMailer, expected: &str) {
    let last = get_last_email(mailer);
    // Only the match result is reported; the key itself stays out of the message.
    assert!(
        last.api_key.expose() == expected,
        "Expected the last email to be delivered with the configured key, but a different key was used"
    );
}
