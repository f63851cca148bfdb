//! AWS Parameters and Secrets Lambda extension resolver.
//!
//! The extension runs as a side-car inside the Lambda execution environment
//! and caches parameters on `localhost`. Requests authenticate with the
//! function's session token in `X-Aws-Parameters-Secrets-Token`.

use async_trait::async_trait;
use reqwest::Client;

use super::{value_from_response, ParameterRef, SecretResolver, SecretValue};
use crate::error::NotifyError;

/// Default port of the extension's HTTP listener.
pub const DEFAULT_EXTENSION_PORT: u16 = 2773;

const TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

/// Resolver backed by the Lambda Parameters and Secrets extension.
pub struct ParametersExtension {
    session_token: String,
    client: Client,
    base_url: String,
}

impl ParametersExtension {
    /// Create a resolver listening on `localhost:{port}`.
    pub fn new(port: u16, session_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
            client: Client::new(),
            base_url: format!("http://localhost:{}", port),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request_url(&self, parameter: &ParameterRef) -> String {
        let mut url = format!(
            "{}/systemsmanager/parameters/get?name={}",
            self.base_url,
            urlencoding::encode(&parameter.name)
        );
        if let Some(version) = parameter.version {
            url.push_str(&format!("&version={}", version));
        }
        url.push_str("&withDecryption=true");
        url
    }
}

#[async_trait]
impl SecretResolver for ParametersExtension {
    async fn resolve(&self, parameter: &ParameterRef) -> Result<SecretValue, NotifyError> {
        let selector = parameter.selector();

        let response = self
            .client
            .get(self.request_url(parameter))
            .header(TOKEN_HEADER, &self.session_token)
            .send()
            .await
            .map_err(|e| NotifyError::secret(&selector, format!("Extension unreachable: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NotifyError::secret(&selector, format!("Unreadable response: {}", e)))?;

        if !status.is_success() {
            let detail = text.trim();
            let message = if detail.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), detail)
            };
            return Err(NotifyError::secret(selector, message));
        }

        value_from_response(&text, parameter)
    }

    fn resolver_name(&self) -> &'static str {
        "extension"
    }
}
