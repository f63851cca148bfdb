//! SSM Parameter Store resolver.
//!
//! Calls the `AmazonSSM.GetParameter` JSON action directly, with
//! `WithDecryption` set, and signs the request with AWS Signature v4.
//!
//! ```rust,ignore
//! use pipeline_alerts::secrets::{AwsCredentials, ParameterRef, SecretResolver, SsmParameterStore};
//!
//! let store = SsmParameterStore::new("us-east-1", AwsCredentials::from_env()?);
//! let key = store.resolve(&ParameterRef::new("SENDGRID_KEY").version(1)).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::sigv4::{sign_post, AwsCredentials};
use super::{value_from_response, ParameterRef, SecretResolver, SecretValue};
use crate::error::NotifyError;

const SERVICE_NAME: &str = "ssm";
const TARGET: &str = "AmazonSSM.GetParameter";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Resolver backed by the SSM `GetParameter` API.
pub struct SsmParameterStore {
    region: String,
    credentials: AwsCredentials,
    host: Option<String>,
    client: Client,
}

impl SsmParameterStore {
    /// Create a resolver for `region`.
    pub fn new(region: impl Into<String>, credentials: AwsCredentials) -> Self {
        Self {
            region: region.into(),
            credentials,
            host: None,
            client: Client::new(),
        }
    }

    /// Create with a custom reqwest client.
    pub fn with_client(
        region: impl Into<String>,
        credentials: AwsCredentials,
        client: Client,
    ) -> Self {
        Self {
            region: region.into(),
            credentials,
            host: None,
            client,
        }
    }

    /// Set a custom endpoint (for testing or VPC endpoints).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    fn base_url(&self) -> String {
        match &self.host {
            Some(host) => host.clone(),
            None => format!("https://{}", self.host_header()),
        }
    }

    fn host_header(&self) -> String {
        format!("ssm.{}.amazonaws.com", self.region)
    }
}

#[async_trait]
impl SecretResolver for SsmParameterStore {
    async fn resolve(&self, parameter: &ParameterRef) -> Result<SecretValue, NotifyError> {
        let selector = parameter.selector();
        let body = serde_json::to_string(&GetParameterRequest {
            name: &selector,
            with_decryption: true,
        })?;

        let headers = sign_post(
            &self.credentials,
            &self.region,
            SERVICE_NAME,
            &self.host_header(),
            &[("Content-Type", CONTENT_TYPE), ("X-Amz-Target", TARGET)],
            &body,
            Utc::now(),
        );

        let mut request = self.client.post(self.base_url());
        for (name, value) in headers {
            request = request.header(&name, &value);
        }
        request = request.header("User-Agent", format!("pipeline-alerts/{}", crate::VERSION));

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| NotifyError::secret(&selector, format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NotifyError::secret(&selector, format!("Unreadable response: {}", e)))?;

        if status.is_success() {
            return value_from_response(&text, parameter);
        }

        let message = match serde_json::from_str::<SsmError>(&text) {
            Ok(err) => {
                let kind = err
                    .error_type
                    .as_deref()
                    .map(|t| t.rsplit('#').next().unwrap_or(t))
                    .unwrap_or("Unknown");
                let detail = err
                    .message
                    .or(err.message_upper)
                    .unwrap_or_else(|| "Unknown error".to_string());
                format!("[{}] {} (HTTP {})", kind, detail, status.as_u16())
            }
            Err(_) => format!("HTTP {}", status.as_u16()),
        };

        Err(NotifyError::secret(selector, message))
    }

    fn resolver_name(&self) -> &'static str {
        "ssm"
    }
}

#[derive(Debug, Serialize)]
struct GetParameterRequest<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "WithDecryption")]
    with_decryption: bool,
}

#[derive(Debug, Deserialize)]
struct SsmError {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}
