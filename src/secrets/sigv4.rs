//! AWS Signature v4 for JSON-protocol requests.

use chrono::{DateTime, Utc};
use ring::hmac;
use sha2::{Digest, Sha256};
use std::env;
use std::fmt;

use crate::error::NotifyError;

const ENCODING: &str = "AWS4-HMAC-SHA256";

/// Credentials used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for temporary (role) credentials, as in Lambda.
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, NotifyError> {
        let access_key_id = lookup("AWS_ACCESS_KEY_ID")
            .ok_or_else(|| NotifyError::Configuration("AWS_ACCESS_KEY_ID not set".into()))?;
        let secret_access_key = lookup("AWS_SECRET_ACCESS_KEY")
            .ok_or_else(|| NotifyError::Configuration("AWS_SECRET_ACCESS_KEY not set".into()))?;

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: lookup("AWS_SESSION_TOKEN"),
        })
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Sign a `POST /` request and return the full header list, `Authorization` last.
///
/// `headers` must not contain `Host`, `X-Amz-Date` or `X-Amz-Security-Token`;
/// those are added here.
pub(crate) fn sign_post(
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    host: &str,
    headers: &[(&str, &str)],
    body: &str,
    date_time: DateTime<Utc>,
) -> Vec<(String, String)> {
    let amz_date_str = amz_datetime(&date_time);
    let date = amz_date(&date_time);

    let mut signed: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.trim().to_string()))
        .collect();
    signed.push(("Host".to_string(), host.to_string()));
    signed.push(("X-Amz-Date".to_string(), amz_date_str.clone()));
    if let Some(ref token) = credentials.session_token {
        signed.push(("X-Amz-Security-Token".to_string(), token.clone()));
    }

    signed.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

    let signed_headers = signed
        .iter()
        .map(|(k, _)| k.to_lowercase())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers = signed
        .iter()
        .map(|(k, v)| format!("{}:{}", k.to_lowercase(), v))
        .collect::<Vec<_>>()
        .join("\n");

    let body_hash = hex_sha256(body.as_bytes());

    let canonical_request = format!(
        "POST\n/\n\n{}\n\n{}\n{}",
        canonical_headers, signed_headers, body_hash
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date, region, service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ENCODING,
        amz_date_str,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signature = signature(
        &credentials.secret_access_key,
        &date,
        region,
        service,
        &string_to_sign,
    );

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ENCODING, credentials.access_key_id, credential_scope, signed_headers, signature
    );

    signed.push(("Authorization".to_string(), authorization));
    signed
}

fn signature(secret: &str, date: &str, region: &str, service: &str, string_to_sign: &str) -> String {
    let k_secret = format!("AWS4{}", secret);
    let k_date = hmac_sha256(k_secret.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");

    hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn amz_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

fn amz_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}
