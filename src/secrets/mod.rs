//! Provider API key resolution.
//!
//! The SendGrid key is never stored on a mailer. It is resolved fresh for
//! every dispatch through a [`SecretResolver`] and handed to
//! [`Mailer::deliver`](crate::Mailer::deliver) as an argument.
//!
//! ## Available Resolvers
//!
//! | Resolver | Strategy | Description |
//! |----------|----------|-------------|
//! | [`SsmParameterStore`] | `ssm` | `AmazonSSM.GetParameter`, signed with AWS Signature v4 |
//! | [`ParametersExtension`] | `extension` | Lambda Parameters and Secrets extension on localhost |
//! | [`StaticSecret`] | `env` | Fixed value, for local runs and tests |

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

use crate::error::NotifyError;

mod extension;
mod sigv4;
mod ssm;

pub use extension::{ParametersExtension, DEFAULT_EXTENSION_PORT};
pub use sigv4::AwsCredentials;
pub use ssm::SsmParameterStore;

/// Default parameter name holding the SendGrid key.
pub const DEFAULT_PARAMETER_NAME: &str = "SENDGRID_KEY";

/// A named, optionally versioned parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRef {
    pub name: String,
    pub version: Option<u32>,
}

impl ParameterRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Pin a parameter version.
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// SSM selector form: `name` or `name:version`.
    pub fn selector(&self) -> String {
        match self.version {
            Some(v) => format!("{}:{}", self.name, v),
            None => self.name.clone(),
        }
    }
}

impl Default for ParameterRef {
    fn default() -> Self {
        Self::new(DEFAULT_PARAMETER_NAME).version(1)
    }
}

impl fmt::Display for ParameterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector())
    }
}

/// A decrypted secret. Redacted in `Debug`, no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the plaintext value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

/// Source of decrypted parameter values.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Fetch the current decrypted value of `parameter`.
    async fn resolve(&self, parameter: &ParameterRef) -> Result<SecretValue, NotifyError>;

    /// Resolver name (for logging).
    fn resolver_name(&self) -> &'static str {
        "unknown"
    }
}

#[async_trait]
impl<R: SecretResolver + ?Sized> SecretResolver for Box<R> {
    async fn resolve(&self, parameter: &ParameterRef) -> Result<SecretValue, NotifyError> {
        (**self).resolve(parameter).await
    }

    fn resolver_name(&self) -> &'static str {
        (**self).resolver_name()
    }
}

/// Resolver that always returns the same value.
#[derive(Clone)]
pub struct StaticSecret {
    value: SecretValue,
}

impl StaticSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: SecretValue::new(value),
        }
    }
}

#[async_trait]
impl SecretResolver for StaticSecret {
    async fn resolve(&self, _parameter: &ParameterRef) -> Result<SecretValue, NotifyError> {
        Ok(self.value.clone())
    }

    fn resolver_name(&self) -> &'static str {
        "static"
    }
}

// Shared by the SSM API and the extension: both answer with the
// GetParameter response document.
#[derive(Debug, Deserialize)]
struct GetParameterResponse {
    #[serde(rename = "Parameter")]
    parameter: Option<ParameterDocument>,
}

#[derive(Debug, Deserialize)]
struct ParameterDocument {
    #[serde(rename = "Value")]
    value: Option<String>,
}

fn value_from_response(body: &str, parameter: &ParameterRef) -> Result<SecretValue, NotifyError> {
    let response: GetParameterResponse = serde_json::from_str(body).map_err(|e| {
        NotifyError::secret(parameter.selector(), format!("Invalid response: {}", e))
    })?;

    response
        .parameter
        .and_then(|p| p.value)
        .filter(|v| !v.is_empty())
        .map(SecretValue::new)
        .ok_or_else(|| NotifyError::secret(parameter.selector(), "Parameter value missing"))
}
