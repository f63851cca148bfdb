//! Alert delivery.
//!
//! A [`Dispatcher`] owns the fixed sender and recipients, the parameter the
//! provider key lives in, and the mailer. Each call to
//! [`Dispatcher::dispatch`] resolves the key afresh, builds the email, and
//! hands both to the mailer.

use std::str::FromStr;
#[cfg(feature = "metrics")]
use std::time::Instant;

use tracing::Instrument;

use crate::address::Address;
use crate::email::Email;
use crate::error::NotifyError;
use crate::format::{BodyFormat, Notification};
use crate::mailer::{DeliveryResult, Mailer, MailerExt};
use crate::secrets::{ParameterRef, SecretResolver};

/// Language of the status suffix appended to subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    ZhCn,
}

impl Locale {
    /// Human-readable suffix for a status token, if the status is known.
    pub fn suffix(&self, status: &str) -> Option<&'static str> {
        let suffix = match (self, status) {
            (Self::En, "STARTED") => "started",
            (Self::En, "SUCCEEDED") => "succeeded",
            (Self::En, "FAILED") => "failed",
            (Self::En, "RESUMED") => "resumed",
            (Self::En, "IN_PROGRESS") => "in progress",
            (Self::En, "STOPPED") => "stopped",
            (Self::ZhCn, "STARTED") => "已开始",
            (Self::ZhCn, "SUCCEEDED") => "已成功",
            (Self::ZhCn, "FAILED") => "失败",
            (Self::ZhCn, "RESUMED") => "拒绝",
            (Self::ZhCn, "IN_PROGRESS") => "进行中",
            (Self::ZhCn, "STOPPED") => "停了下来",
            _ => return None,
        };
        Some(suffix)
    }

    fn separator(&self) -> &'static str {
        match self {
            Self::En => " ",
            Self::ZhCn => "",
        }
    }

    /// `"{subject} {status}{sep}{suffix}"`, without the suffix for unknown statuses.
    pub fn subject_line(&self, subject: &str, status: &str) -> String {
        match self.suffix(status) {
            Some(suffix) => format!("{} {}{}{}", subject, status, self.separator(), suffix),
            None => format!("{} {}", subject, status),
        }
    }
}

impl FromStr for Locale {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "zh" | "zh-cn" | "zh_cn" => Ok(Self::ZhCn),
            other => Err(NotifyError::Configuration(format!(
                "Unknown locale: {}. Valid locales are: en, zh-CN",
                other
            ))),
        }
    }
}

/// Sends rendered alerts through a [`Mailer`].
pub struct Dispatcher<M, S> {
    mailer: M,
    resolver: S,
    from: Address,
    to: Vec<Address>,
    parameter: ParameterRef,
    locale: Locale,
}

impl<M: Mailer, S: SecretResolver> Dispatcher<M, S> {
    pub fn new(mailer: M, resolver: S, from: Address, to: Vec<Address>) -> Self {
        Self {
            mailer,
            resolver,
            from,
            to,
            parameter: ParameterRef::default(),
            locale: Locale::default(),
        }
    }

    /// Parameter holding the provider key (default `SENDGRID_KEY:1`).
    pub fn parameter(mut self, parameter: ParameterRef) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Build the email for `notification` without sending it.
    pub fn build_email(&self, notification: &Notification) -> Email {
        let email = Email::new()
            .from(&self.from)
            .put_to(self.to.clone())
            .subject(
                self.locale
                    .subject_line(&notification.subject, &notification.status),
            );

        match notification.format {
            BodyFormat::Text => email.text_body(notification.body.as_str()),
            BodyFormat::Html => email.html_body(notification.body.as_str()),
        }
    }

    /// Resolve the provider key and send `notification`.
    pub async fn dispatch(&self, notification: &Notification) -> Result<DeliveryResult, NotifyError> {
        let provider = self.mailer.provider_name();
        let email = self.build_email(notification);

        let span = tracing::info_span!(
            "pipeline_alerts.dispatch",
            provider = provider,
            to = ?self.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
            subject = %email.subject,
        );

        async {
            #[cfg(feature = "metrics")]
            let start = Instant::now();

            let result = self.send(&email).await;

            #[cfg(feature = "metrics")]
            {
                let duration = start.elapsed().as_secs_f64();
                let status = if result.is_ok() { "success" } else { "error" };
                metrics::counter!("pipeline_alerts_emails_total", "provider" => provider, "status" => status)
                    .increment(1);
                metrics::histogram!("pipeline_alerts_delivery_duration_seconds", "provider" => provider)
                    .record(duration);
            }

            match &result {
                Ok(r) => tracing::info!(message_id = %r.message_id, "Email delivered"),
                Err(e) => tracing::error!(error = %e, "Email delivery failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn send(&self, email: &Email) -> Result<DeliveryResult, NotifyError> {
        self.mailer.validate(email)?;

        let secret_span = tracing::info_span!(
            "pipeline_alerts.secret",
            resolver = self.resolver.resolver_name(),
            parameter = %self.parameter,
        );
        let api_key = self
            .resolver
            .resolve(&self.parameter)
            .instrument(secret_span)
            .await?;

        tracing::debug!("Delivering email");
        self.mailer.deliver(email, &api_key).await
    }
}
