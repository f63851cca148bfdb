//! Error types for pipeline-alerts.

use thiserror::Error;

/// Errors that can occur while decoding, formatting, or dispatching an alert.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// Configuration error (missing env var, invalid value, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing required field in the event payload or email.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The event payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The provider API key could not be resolved.
    #[error("Secret error ({parameter}): {message}")]
    Secret {
        parameter: String,
        message: String,
    },

    /// Provider-specific error with details.
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: &'static str,
        message: String,
        /// Optional HTTP status code
        status: Option<u16>,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Event source not handled by this deployment.
    #[error("Unsupported event source: {0}")]
    UnsupportedSource(String),
}

impl NotifyError {
    /// Create a provider-specific error.
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            status: None,
        }
    }

    /// Create a provider error with HTTP status.
    pub fn provider_with_status(
        provider: &'static str,
        message: impl Into<String>,
        status: u16,
    ) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a secret resolution error for a parameter.
    pub fn secret(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Secret {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}
