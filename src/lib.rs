//! # pipeline-alerts
//!
//! Email alerts for CodeBuild and CodePipeline status events.
//!
//! The crate runs as an AWS Lambda function subscribed to an SNS topic. Each
//! SNS record carries one event; it is rendered into a short summary and sent
//! through SendGrid. The SendGrid key is fetched from SSM Parameter Store on
//! every send and handed to the mailer as an argument.
//!
//! ```text
//! SNS batch ─► Notifier ─► Formatter ─► Dispatcher ─► SecretResolver
//!                                            └──────► Mailer (SendGrid)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeline_alerts::config::NotifierConfig;
//! use pipeline_alerts::handle_sns_event;
//!
//! let notifier = NotifierConfig::from_env()?.build_notifier();
//! lambda_runtime::run(lambda_runtime::service_fn(|event| handle_sns_event(event, &notifier))).await?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `NOTIFIER_EVENT_SOURCE` | `codebuild` (default) or `codepipeline` |
//! | `NOTIFIER_BODY_FORMAT` | `html` (default) or `text` |
//! | `NOTIFIER_FROM` / `NOTIFIER_FROM_NAME` | Sender |
//! | `NOTIFIER_TO` / `NOTIFIER_TO_NAME` | Recipients, comma-separated |
//! | `NOTIFIER_SUBJECT` | Fixed subject instead of the project or pipeline name |
//! | `NOTIFIER_LOCALE` | `en` (default) or `zh-CN` status suffixes |
//! | `NOTIFIER_SECRET_NAME` | Parameter holding the SendGrid key (default: `SENDGRID_KEY`) |
//! | `NOTIFIER_SECRET_VERSION` | Parameter version (default: `1`, `latest` for unversioned) |
//! | `NOTIFIER_SECRET_STRATEGY` | `ssm` (default), `extension` or `env` |
//! | `PARAMETERS_SECRETS_EXTENSION_HTTP_PORT` | Extension port (default: 2773) |
//! | `NOTIFIER_LOG_GROUP` / `NOTIFIER_LOG_STREAM_PREFIX` | Log-tail hint for pipeline alerts |
//! | `NOTIFIER_FAIL_ON_ERROR` | Fail the invocation when any record fails (default: false) |
//! | `NOTIFIER_MAILER` | `sendgrid` (default) or `logger` |
//! | `SENDGRID_BASE_URL` | SendGrid endpoint override |
//! | `SENDGRID_API_KEY` | Key for the `env` strategy |
//! | `AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN` | Provided by Lambda |
//! | `RUST_LOG` / `LOG_FORMAT` | Log filter and `json` (default) or `pretty` output |
//!
//! ## Feature Flags
//!
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! Enable `features = ["metrics"]` to emit Prometheus-style metrics:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `pipeline_alerts_emails_total` | Counter | provider, status | Alerts dispatched |
//! | `pipeline_alerts_delivery_duration_seconds` | Histogram | provider | Key lookup plus delivery |
//!
//! Install a recorder (e.g., `metrics-exporter-prometheus`) to collect them.

/// The version of the pipeline-alerts crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod email;
mod error;
mod mailer;

pub mod config;
pub mod dispatch;
pub mod event;
pub mod format;
pub mod handler;
pub mod providers;
pub mod secrets;
pub mod testing;

// Re-exports
pub use address::{Address, ToAddress};
pub use dispatch::{Dispatcher, Locale};
pub use email::Email;
pub use error::NotifyError;
pub use event::{EventPayload, ExecutionTrigger};
pub use format::{BodyFormat, EventSource, Formatter, Notification, PipelineLogHint};
pub use handler::{handle_sns_event, BatchReport, Notifier, RecordOutcome};
pub use mailer::{DeliveryResult, Mailer, MailerExt};
pub use secrets::{ParameterRef, SecretResolver, SecretValue};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::NotifierConfig;
    pub use crate::{
        handle_sns_event, Address, BodyFormat, DeliveryResult, Dispatcher, Email, EventPayload,
        EventSource, Formatter, Locale, Mailer, Notifier, NotifyError, ParameterRef,
        RecordOutcome, SecretResolver, SecretValue,
    };
}
