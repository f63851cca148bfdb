//! SNS batch handling.
//!
//! Every record in an invocation is decoded, rendered and dispatched in
//! order. A failing record is logged and recorded in the [`BatchReport`];
//! it never stops the records after it.

use aws_lambda_events::event::sns::SnsEvent;
use lambda_runtime::LambdaEvent;
use tracing::Instrument;

use crate::dispatch::Dispatcher;
use crate::error::NotifyError;
use crate::event::EventPayload;
use crate::format::Formatter;
use crate::mailer::Mailer;
use crate::secrets::SecretResolver;

/// What happened to one SNS record.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// The alert was accepted by the provider.
    Sent { message_id: String },
    /// The event came from a source this deployment does not handle.
    Skipped { source: String },
    /// The message was not a usable event payload.
    DecodeFailed(NotifyError),
    /// Rendering succeeded but the key lookup or delivery failed.
    DispatchFailed(NotifyError),
}

impl RecordOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::DecodeFailed(_) | Self::DispatchFailed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Sent { .. } => "sent",
            Self::Skipped { .. } => "skipped",
            Self::DecodeFailed(_) => "decode_failed",
            Self::DispatchFailed(_) => "dispatch_failed",
        }
    }
}

/// Outcomes of one invocation, in record order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Sent { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(RecordOutcome::is_failure)
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(RecordOutcome::is_failure)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Emit one summary event for the whole batch.
    pub fn log_summary(&self) {
        if self.has_failures() {
            tracing::warn!(
                records = self.len(),
                sent = self.sent(),
                skipped = self.skipped(),
                failed = self.failed(),
                "Batch finished with failures"
            );
        } else {
            tracing::info!(
                records = self.len(),
                sent = self.sent(),
                skipped = self.skipped(),
                "Batch finished"
            );
        }
    }

    fn count(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

/// Decode → render → dispatch pipeline for SNS records.
pub struct Notifier<M, S> {
    formatter: Formatter,
    dispatcher: Dispatcher<M, S>,
    fail_on_error: bool,
}

impl<M: Mailer, S: SecretResolver> Notifier<M, S> {
    pub fn new(formatter: Formatter, dispatcher: Dispatcher<M, S>) -> Self {
        Self {
            formatter,
            dispatcher,
            fail_on_error: false,
        }
    }

    /// Fail the invocation when any record fails.
    pub fn fail_on_error(mut self, enabled: bool) -> Self {
        self.fail_on_error = enabled;
        self
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn dispatcher(&self) -> &Dispatcher<M, S> {
        &self.dispatcher
    }

    /// Run one raw SNS message through the pipeline.
    pub async fn process_record(&self, raw: &str) -> RecordOutcome {
        let payload = match EventPayload::parse(raw) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Invalid event payload");
                return RecordOutcome::DecodeFailed(e);
            }
        };

        let notification = match self.formatter.render(&payload) {
            Ok(Some(notification)) => notification,
            Ok(None) => {
                tracing::info!(
                    source = %payload.source,
                    expected = %self.formatter.source(),
                    "Ignoring event from another source"
                );
                return RecordOutcome::Skipped {
                    source: payload.source,
                };
            }
            Err(e) => {
                tracing::error!(error = %e, source = %payload.source, "Event could not be rendered");
                return RecordOutcome::DecodeFailed(e);
            }
        };

        match self.dispatcher.dispatch(&notification).await {
            Ok(delivery) => RecordOutcome::Sent {
                message_id: delivery.message_id,
            },
            Err(e) => RecordOutcome::DispatchFailed(e),
        }
    }

    /// Process `messages` strictly in order.
    pub async fn handle_batch<I>(&self, messages: I) -> BatchReport
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut report = BatchReport::default();

        for (index, message) in messages.into_iter().enumerate() {
            let span = tracing::info_span!("pipeline_alerts.record", index = index);
            let outcome = self.process_record(message.as_ref()).instrument(span).await;
            tracing::debug!(index = index, outcome = outcome.label(), "Record processed");
            report.outcomes.push(outcome);
        }

        report
    }

    fn strict_result(&self, failure: impl FnOnce() -> String) -> Result<(), lambda_runtime::Error> {
        if self.fail_on_error {
            Err(failure().into())
        } else {
            Ok(())
        }
    }
}

/// Lambda entry point: decode the SNS batch and process every record.
///
/// Returns `Ok(())` even when records fail, unless the notifier runs with
/// [`Notifier::fail_on_error`].
pub async fn handle_sns_event<M: Mailer, S: SecretResolver>(
    event: LambdaEvent<serde_json::Value>,
    notifier: &Notifier<M, S>,
) -> Result<(), lambda_runtime::Error> {
    let request_id = event.context.request_id.clone();

    let sns: SnsEvent = match serde_json::from_value(event.payload) {
        Ok(sns) => sns,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Invalid SNS event");
            return notifier.strict_result(|| format!("Invalid SNS event: {}", e));
        }
    };

    let report = notifier
        .handle_batch(sns.records.iter().map(|record| record.sns.message.as_str()))
        .await;
    report.log_summary();

    if report.has_failures() {
        let failed = report.failed();
        return notifier.strict_result(|| format!("{} of {} records failed", failed, report.len()));
    }
    Ok(())
}
