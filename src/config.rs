//! Environment configuration.
//!
//! Everything is read once at cold start. Missing or invalid values are
//! reported as [`NotifyError::Configuration`] before the runtime starts
//! accepting events.
//!
//! ```rust,ignore
//! use pipeline_alerts::config::NotifierConfig;
//!
//! let config = NotifierConfig::from_env()?;
//! let notifier = config.build_notifier()?;
//! ```

use std::env;

use crate::address::Address;
use crate::dispatch::{Dispatcher, Locale};
use crate::error::NotifyError;
use crate::format::{BodyFormat, EventSource, Formatter, PipelineLogHint};
use crate::handler::Notifier;
use crate::mailer::Mailer;
use crate::providers::{LoggerMailer, SendGridMailer, SENDGRID_API_URL};
use crate::secrets::{
    AwsCredentials, ParameterRef, ParametersExtension, SecretResolver, SsmParameterStore,
    StaticSecret, DEFAULT_EXTENSION_PORT, DEFAULT_PARAMETER_NAME,
};

/// How the provider key is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretStrategy {
    /// Signed `GetParameter` call against SSM.
    Ssm {
        region: String,
        credentials: AwsCredentials,
    },
    /// Parameters and Secrets extension on localhost.
    Extension { port: u16, session_token: String },
    /// `SENDGRID_API_KEY` from the environment.
    Env { api_key: String },
}

/// Which mailer delivers alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailerKind {
    #[default]
    SendGrid,
    /// Log alerts instead of sending them.
    Logger,
}

/// Notifier settings read from the environment.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub source: EventSource,
    pub body_format: BodyFormat,
    pub from: Address,
    pub to: Vec<Address>,
    pub subject: Option<String>,
    pub locale: Locale,
    pub parameter: ParameterRef,
    pub secret_strategy: SecretStrategy,
    pub pipeline_log_hint: Option<PipelineLogHint>,
    pub fail_on_error: bool,
    pub mailer: MailerKind,
    pub sendgrid_base_url: String,
}

impl NotifierConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NotifyError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let source = match var("NOTIFIER_EVENT_SOURCE") {
            Some(s) => s.parse()?,
            None => EventSource::CodeBuild,
        };
        let body_format = match var("NOTIFIER_BODY_FORMAT") {
            Some(s) => s.parse()?,
            None => BodyFormat::Html,
        };
        let locale = match var("NOTIFIER_LOCALE") {
            Some(s) => s.parse()?,
            None => Locale::En,
        };

        let from = var("NOTIFIER_FROM")
            .ok_or_else(|| NotifyError::Configuration("NOTIFIER_FROM not set".into()))?;
        let from = match var("NOTIFIER_FROM_NAME") {
            Some(name) => Address::parse_with_name(&name, &from)?,
            None => Address::parse(&from)?,
        };

        let to = var("NOTIFIER_TO")
            .ok_or_else(|| NotifyError::Configuration("NOTIFIER_TO not set".into()))?;
        let mut to = Address::parse_list(&to)?;
        if to.is_empty() {
            return Err(NotifyError::Configuration(
                "NOTIFIER_TO has no recipients".into(),
            ));
        }
        if let Some(name) = var("NOTIFIER_TO_NAME") {
            for address in to.iter_mut().filter(|a| a.name.is_none()) {
                address.name = Some(name.clone());
            }
        }

        let mut parameter =
            ParameterRef::new(var("NOTIFIER_SECRET_NAME").unwrap_or_else(|| DEFAULT_PARAMETER_NAME.into()));
        match var("NOTIFIER_SECRET_VERSION").as_deref() {
            // "latest" leaves the selector unversioned.
            Some("latest") => {}
            Some(v) => {
                let version = v.parse().map_err(|_| {
                    NotifyError::Configuration(format!("Invalid NOTIFIER_SECRET_VERSION: {}", v))
                })?;
                parameter = parameter.version(version);
            }
            None => parameter = parameter.version(1),
        }

        let strategy = var("NOTIFIER_SECRET_STRATEGY").map(|s| s.to_lowercase());
        let secret_strategy = match strategy.as_deref().unwrap_or("ssm") {
            "ssm" => SecretStrategy::Ssm {
                region: var("AWS_REGION")
                    .or_else(|| var("AWS_DEFAULT_REGION"))
                    .ok_or_else(|| NotifyError::Configuration("AWS_REGION not set".into()))?,
                credentials: AwsCredentials::from_lookup(&var)?,
            },
            "extension" => {
                let port = match var("PARAMETERS_SECRETS_EXTENSION_HTTP_PORT") {
                    Some(p) => p.parse().map_err(|_| {
                        NotifyError::Configuration(format!(
                            "Invalid PARAMETERS_SECRETS_EXTENSION_HTTP_PORT: {}",
                            p
                        ))
                    })?,
                    None => DEFAULT_EXTENSION_PORT,
                };
                SecretStrategy::Extension {
                    port,
                    session_token: var("AWS_SESSION_TOKEN").ok_or_else(|| {
                        NotifyError::Configuration("AWS_SESSION_TOKEN not set".into())
                    })?,
                }
            }
            "env" => SecretStrategy::Env {
                api_key: var("SENDGRID_API_KEY")
                    .ok_or_else(|| NotifyError::Configuration("SENDGRID_API_KEY not set".into()))?,
            },
            other => {
                return Err(NotifyError::Configuration(format!(
                    "Unknown secret strategy: {}. Valid strategies are: ssm, extension, env",
                    other
                )))
            }
        };

        let pipeline_log_hint = match (var("NOTIFIER_LOG_GROUP"), var("NOTIFIER_LOG_STREAM_PREFIX")) {
            (Some(log_group), Some(stream_prefix)) => Some(PipelineLogHint {
                log_group,
                stream_prefix,
            }),
            (None, None) => None,
            _ => {
                return Err(NotifyError::Configuration(
                    "NOTIFIER_LOG_GROUP and NOTIFIER_LOG_STREAM_PREFIX must be set together".into(),
                ))
            }
        };

        let fail_on_error = match var("NOTIFIER_FAIL_ON_ERROR") {
            Some(v) => parse_bool("NOTIFIER_FAIL_ON_ERROR", &v)?,
            None => false,
        };

        let mailer = match var("NOTIFIER_MAILER").map(|m| m.to_lowercase()).as_deref() {
            None | Some("sendgrid") => MailerKind::SendGrid,
            Some("logger") => MailerKind::Logger,
            Some(other) => {
                return Err(NotifyError::Configuration(format!(
                    "Unknown mailer: {}. Valid mailers are: sendgrid, logger",
                    other
                )))
            }
        };

        Ok(Self {
            source,
            body_format,
            from,
            to,
            subject: var("NOTIFIER_SUBJECT"),
            locale,
            parameter,
            secret_strategy,
            pipeline_log_hint,
            fail_on_error,
            mailer,
            sendgrid_base_url: var("SENDGRID_BASE_URL").unwrap_or_else(|| SENDGRID_API_URL.into()),
        })
    }

    pub fn build_formatter(&self) -> Formatter {
        let mut formatter = Formatter::new(self.source, self.body_format);
        if let Some(ref subject) = self.subject {
            formatter = formatter.subject(subject);
        }
        if let Some(ref hint) = self.pipeline_log_hint {
            formatter = formatter.pipeline_log_hint(hint.clone());
        }
        formatter
    }

    pub fn build_mailer(&self) -> Box<dyn Mailer> {
        match self.mailer {
            MailerKind::SendGrid => {
                Box::new(SendGridMailer::new().base_url(&self.sendgrid_base_url))
            }
            MailerKind::Logger => Box::new(LoggerMailer::full()),
        }
    }

    pub fn build_resolver(&self) -> Box<dyn SecretResolver> {
        match &self.secret_strategy {
            SecretStrategy::Ssm {
                region,
                credentials,
            } => Box::new(SsmParameterStore::new(region, credentials.clone())),
            SecretStrategy::Extension {
                port,
                session_token,
            } => Box::new(ParametersExtension::new(*port, session_token)),
            SecretStrategy::Env { api_key } => Box::new(StaticSecret::new(api_key)),
        }
    }

    /// Assemble the full pipeline.
    pub fn build_notifier(&self) -> Notifier<Box<dyn Mailer>, Box<dyn SecretResolver>> {
        let dispatcher = Dispatcher::new(
            self.build_mailer(),
            self.build_resolver(),
            self.from.clone(),
            self.to.clone(),
        )
        .parameter(self.parameter.clone())
        .locale(self.locale);

        Notifier::new(self.build_formatter(), dispatcher).fail_on_error(self.fail_on_error)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, NotifyError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(NotifyError::Configuration(format!(
            "Invalid {}: {}",
            key, other
        ))),
    }
}
