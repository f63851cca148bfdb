//! Alert rendering.
//!
//! A [`Formatter`] is bound to one event source per deployment. Events from
//! any other source render to `None` and are ignored.
//!
//! ```
//! use pipeline_alerts::{BodyFormat, EventPayload, EventSource, Formatter};
//!
//! let payload = EventPayload::parse(r#"{
//!     "source": "aws.codepipeline", "account": "111111111111", "region": "us-east-1",
//!     "detail": {"state": "SUCCEEDED", "pipeline": "demo-pipeline",
//!                "execution-id": "exec-123", "start-time": "2024-01-01T00:00:00Z"}
//! }"#).unwrap();
//!
//! let formatter = Formatter::new(EventSource::CodePipeline, BodyFormat::Text);
//! let notification = formatter.render(&payload).unwrap().unwrap();
//! assert!(notification.body.starts_with("Account: 111111111111\r\n"));
//! assert_eq!(notification.status, "SUCCEEDED");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::NotifyError;
use crate::event::{EventPayload, ExecutionTrigger, GenericTrigger, PushTrigger};

/// Build status for which CodeBuild has not yet published log locations.
pub const IN_PROGRESS: &str = "IN_PROGRESS";

const LINE_END: &str = "\r\n";

/// Event source a deployment handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    CodeBuild,
    CodePipeline,
}

impl EventSource {
    /// Value of the payload's `source` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeBuild => "aws.codebuild",
            Self::CodePipeline => "aws.codepipeline",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "codebuild" | "aws.codebuild" => Ok(Self::CodeBuild),
            "codepipeline" | "aws.codepipeline" => Ok(Self::CodePipeline),
            other => Err(NotifyError::UnsupportedSource(other.to_string())),
        }
    }
}

/// Body encoding of rendered alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// `Label: value` lines.
    Text,
    /// `<strong>Label:</strong> value<br/>` lines, values HTML-escaped.
    #[default]
    Html,
}

impl FromStr for BodyFormat {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            other => Err(NotifyError::Configuration(format!(
                "Unknown body format: {}. Valid formats are: html, text",
                other
            ))),
        }
    }
}

/// Fixed log location appended to every pipeline alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLogHint {
    pub log_group: String,
    pub stream_prefix: String,
}

/// A rendered alert, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Status token qualifying the subject (`build-status` or `state`).
    pub status: String,
    /// Subject text (project or pipeline name unless overridden).
    pub subject: String,
    pub body: String,
    pub format: BodyFormat,
}

/// Renders events from one source into [`Notification`]s.
#[derive(Debug, Clone)]
pub struct Formatter {
    source: EventSource,
    format: BodyFormat,
    subject: Option<String>,
    pipeline_hint: Option<PipelineLogHint>,
}

impl Formatter {
    pub fn new(source: EventSource, format: BodyFormat) -> Self {
        Self {
            source,
            format,
            subject: None,
            pipeline_hint: None,
        }
    }

    /// Use a fixed subject instead of the project or pipeline name.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Append a fixed log-tail hint to every pipeline alert.
    pub fn pipeline_log_hint(mut self, hint: PipelineLogHint) -> Self {
        self.pipeline_hint = Some(hint);
        self
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    /// Whether `payload` comes from the source this formatter handles.
    pub fn accepts(&self, payload: &EventPayload) -> bool {
        payload.source == self.source.as_str()
    }

    /// Render `payload`, or `Ok(None)` if it comes from another source.
    pub fn render(&self, payload: &EventPayload) -> Result<Option<Notification>, NotifyError> {
        if !self.accepts(payload) {
            return Ok(None);
        }

        let notification = match self.source {
            EventSource::CodeBuild => self.render_build(payload)?,
            EventSource::CodePipeline => self.render_pipeline(payload)?,
        };
        Ok(Some(notification))
    }

    fn render_build(&self, payload: &EventPayload) -> Result<Notification, NotifyError> {
        let detail = payload.build_detail()?;
        let time = payload
            .time
            .as_deref()
            .or(detail.time.as_deref())
            .ok_or(NotifyError::MissingField("time"))?;

        let mut body = Body::new(self.format);
        body.line("Account", &payload.account);
        body.line("Region", &payload.region);
        body.line("State", &detail.build_status);
        body.line("Time", time);
        body.line("CodeBuild", &detail.project_name);
        body.line("Execution ID", &detail.build_id);

        if let Some(ref trigger) = detail.execution_trigger {
            body.trigger(trigger);
        }

        // Log locations only exist once the build has left IN_PROGRESS, and
        // builds failing before provisioning never get a group or stream.
        if detail.build_status != IN_PROGRESS {
            let location = detail
                .logs()
                .and_then(|logs| Some((logs.group_name.as_deref()?, logs.stream_name.as_deref()?)));
            match location {
                Some((group, stream)) => body.log_hint(group, stream),
                None => tracing::warn!(
                    build_id = %detail.build_id,
                    status = %detail.build_status,
                    "Build event has no log location, sending alert without log hint"
                ),
            }
        }

        Ok(Notification {
            status: detail.build_status,
            subject: self.subject.clone().unwrap_or(detail.project_name),
            body: body.finish(),
            format: self.format,
        })
    }

    fn render_pipeline(&self, payload: &EventPayload) -> Result<Notification, NotifyError> {
        let detail = payload.pipeline_detail()?;

        let mut body = Body::new(self.format);
        body.line("Account", &payload.account);
        body.line("Region", &payload.region);
        body.line("State", &detail.state);
        body.line("Start Time", detail.start_time.as_deref().unwrap_or_default());
        body.line("Pipeline", &detail.pipeline);
        body.line("Execution ID", &detail.execution_id);

        if let Some(ref trigger) = detail.execution_trigger {
            body.trigger(trigger);
        }

        if let Some(ref hint) = self.pipeline_hint {
            body.log_hint(&hint.log_group, &hint.stream_prefix);
        }

        Ok(Notification {
            status: detail.state,
            subject: self.subject.clone().unwrap_or(detail.pipeline),
            body: body.finish(),
            format: self.format,
        })
    }
}

struct Body {
    format: BodyFormat,
    buf: String,
}

impl Body {
    fn new(format: BodyFormat) -> Self {
        Self {
            format,
            buf: String::new(),
        }
    }

    fn line(&mut self, label: &str, value: &str) {
        match self.format {
            BodyFormat::Text => {
                self.buf.push_str(label);
                self.buf.push_str(": ");
                self.buf.push_str(value);
                self.buf.push_str(LINE_END);
            }
            BodyFormat::Html => {
                self.buf.push_str("<strong>");
                self.buf.push_str(label);
                self.buf.push_str(":</strong> ");
                self.buf.push_str(&html_escape(value));
                self.buf.push_str("<br/>");
                self.buf.push_str(LINE_END);
            }
        }
    }

    fn optional_line(&mut self, label: &str, value: &Option<String>) {
        self.line(label, value.as_deref().unwrap_or_default());
    }

    fn trigger(&mut self, trigger: &ExecutionTrigger) {
        match trigger {
            ExecutionTrigger::Generic(GenericTrigger {
                trigger_type,
                trigger_detail,
            }) => {
                self.line("Trigger Type", trigger_type);
                self.optional_line("Trigger Detail", trigger_detail);
            }
            ExecutionTrigger::Push(PushTrigger {
                author_display_name,
                author_email,
                full_repository_name,
                branch_name,
                author_date,
                commit_message,
            }) => {
                self.optional_line("Author", author_display_name);
                self.optional_line("Email", author_email);
                self.optional_line("Repository", full_repository_name);
                self.optional_line("Branch", branch_name);
                self.optional_line("Commit Date", author_date);
                self.optional_line("Commit Message", commit_message);
            }
        }
    }

    fn log_hint(&mut self, group: &str, stream_prefix: &str) {
        let command = format!(
            "aws logs tail {} --log-stream-name-prefix {} --follow --since 1h",
            group, stream_prefix
        );
        match self.format {
            BodyFormat::Text => {
                self.buf.push_str("Follow in Cloudwatch:");
                self.buf.push_str(LINE_END);
                self.buf.push_str(&command);
                self.buf.push_str(LINE_END);
            }
            BodyFormat::Html => {
                self.buf.push_str("<hr>Follow in Cloudwatch:<br/>");
                self.buf.push_str(LINE_END);
                self.buf.push_str(&html_escape(&command));
                self.buf.push_str("<br/>");
                self.buf.push_str(LINE_END);
            }
        }
    }

    fn finish(self) -> String {
        self.buf
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline_payload(detail: serde_json::Value) -> EventPayload {
        EventPayload::parse(
            &json!({
                "source": "aws.codepipeline",
                "account": "111111111111",
                "region": "us-east-1",
                "detail": detail
            })
            .to_string(),
        )
        .unwrap()
    }

    fn build_payload(status: &str, detail_extra: serde_json::Value) -> EventPayload {
        let mut detail = json!({
            "build-status": status,
            "project-name": "api",
            "build-id": "arn:aws:codebuild:us-east-1:111111111111:build/api:42"
        });
        if let (Some(d), Some(extra)) = (detail.as_object_mut(), detail_extra.as_object()) {
            d.extend(extra.clone());
        }
        EventPayload::parse(
            &json!({
                "source": "aws.codebuild",
                "account": "111111111111",
                "region": "us-east-1",
                "time": "2024-01-01T00:00:00Z",
                "detail": detail
            })
            .to_string(),
        )
        .unwrap()
    }

    fn logs() -> serde_json::Value {
        json!({"additional-information": {
            "logs": {"group-name": "/aws/codebuild/api", "stream-name": "abc-123"}
        }})
    }

    #[test]
    fn test_pipeline_header_lines() {
        let formatter = Formatter::new(EventSource::CodePipeline, BodyFormat::Text);
        let payload = pipeline_payload(json!({
            "state": "SUCCEEDED",
            "pipeline": "demo-pipeline",
            "execution-id": "exec-123",
            "start-time": "2024-01-01T00:00:00Z"
        }));

        let notification = formatter.render(&payload).unwrap().unwrap();
        assert_eq!(
            notification.body,
            "Account: 111111111111\r\n\
             Region: us-east-1\r\n\
             State: SUCCEEDED\r\n\
             Start Time: 2024-01-01T00:00:00Z\r\n\
             Pipeline: demo-pipeline\r\n\
             Execution ID: exec-123\r\n"
        );
        assert_eq!(notification.subject, "demo-pipeline");
        assert_eq!(notification.format, BodyFormat::Text);
    }

    #[test]
    fn test_other_source_is_skipped() {
        let formatter = Formatter::new(EventSource::CodeBuild, BodyFormat::Html);
        let payload = pipeline_payload(json!({
            "state": "SUCCEEDED",
            "pipeline": "demo-pipeline",
            "execution-id": "exec-123"
        }));

        assert!(!formatter.accepts(&payload));
        assert!(formatter.render(&payload).unwrap().is_none());
    }

    #[test]
    fn test_build_in_progress_has_no_hint() {
        let formatter = Formatter::new(EventSource::CodeBuild, BodyFormat::Text);
        let body = formatter
            .render(&build_payload(IN_PROGRESS, json!({})))
            .unwrap()
            .unwrap()
            .body;

        assert!(body.contains("State: IN_PROGRESS\r\n"));
        assert!(body.contains("Time: 2024-01-01T00:00:00Z\r\n"));
        assert!(body.contains("CodeBuild: api\r\n"));
        assert!(!body.contains("Follow in Cloudwatch"));
    }

    #[test]
    fn test_build_finished_has_hint() {
        let formatter = Formatter::new(EventSource::CodeBuild, BodyFormat::Html);
        for status in ["SUCCEEDED", "FAILED", "STOPPED"] {
            let notification = formatter
                .render(&build_payload(status, logs()))
                .unwrap()
                .unwrap();
            assert_eq!(notification.status, status);
            assert!(notification.body.ends_with(
                "<hr>Follow in Cloudwatch:<br/>\r\n\
                 aws logs tail /aws/codebuild/api --log-stream-name-prefix abc-123 --follow --since 1h<br/>\r\n"
            ));
        }
    }

    #[test]
    fn test_build_failed_before_logging_still_alerts() {
        let formatter = Formatter::new(EventSource::CodeBuild, BodyFormat::Html);
        let payload = build_payload(
            "FAILED",
            json!({"additional-information": {"logs": {
                "deep-link": "https://console.aws.amazon.com/cloudwatch/home?region=us-east-1#logEvent:group=null;stream=null"
            }}}),
        );

        let notification = formatter.render(&payload).unwrap().unwrap();
        assert_eq!(notification.status, "FAILED");
        assert!(notification
            .body
            .contains("<strong>State:</strong> FAILED<br/>\r\n"));
        assert!(!notification.body.contains("Follow in Cloudwatch"));

        let without_block = formatter
            .render(&build_payload("FAILED", json!({})))
            .unwrap()
            .unwrap();
        assert!(!without_block.body.contains("Follow in Cloudwatch"));
    }

    #[test]
    fn test_build_time_falls_back_to_detail() {
        let formatter = Formatter::new(EventSource::CodeBuild, BodyFormat::Text);
        let payload = EventPayload::parse(
            &json!({
                "source": "aws.codebuild",
                "account": "1",
                "region": "eu-west-1",
                "detail": {
                    "build-status": "IN_PROGRESS",
                    "project-name": "api",
                    "build-id": "b1",
                    "time": "detail-time"
                }
            })
            .to_string(),
        )
        .unwrap();

        let body = formatter.render(&payload).unwrap().unwrap().body;
        assert!(body.contains("Time: detail-time\r\n"));
    }

    #[test]
    fn test_generic_trigger_lines() {
        let formatter = Formatter::new(EventSource::CodePipeline, BodyFormat::Text);
        let payload = pipeline_payload(json!({
            "state": "STARTED",
            "pipeline": "demo",
            "execution-id": "e1",
            "execution-trigger": {
                "trigger-type": "StartPipelineExecution",
                "trigger-detail": "arn:aws:iam::1:user/ci"
            }
        }));

        let body = formatter.render(&payload).unwrap().unwrap().body;
        assert!(body.contains("Trigger Type: StartPipelineExecution\r\n"));
        assert!(body.contains("Trigger Detail: arn:aws:iam::1:user/ci\r\n"));
        assert!(!body.contains("Author:"));
        assert!(!body.contains("Commit Message:"));
    }

    #[test]
    fn test_push_trigger_lines() {
        let formatter = Formatter::new(EventSource::CodeBuild, BodyFormat::Text);
        let payload = build_payload(
            IN_PROGRESS,
            json!({"execution-trigger": {
                "author-display-name": "Ada",
                "full-repository-name": "org/repo",
                "branch-name": "main",
                "commit-message": "Fix build"
            }}),
        );

        let body = formatter.render(&payload).unwrap().unwrap().body;
        assert!(body.contains("Author: Ada\r\n"));
        assert!(body.contains("Email: \r\n"));
        assert!(body.contains("Repository: org/repo\r\n"));
        assert!(body.contains("Branch: main\r\n"));
        assert!(body.contains("Commit Date: \r\n"));
        assert!(body.contains("Commit Message: Fix build\r\n"));
        assert!(!body.contains("Trigger Type:"));
    }

    #[test]
    fn test_source_parse() {
        assert_eq!("codebuild".parse::<EventSource>().unwrap(), EventSource::CodeBuild);
        assert_eq!(
            "aws.codepipeline".parse::<EventSource>().unwrap(),
            EventSource::CodePipeline
        );
        assert!(matches!(
            "aws.s3".parse::<EventSource>(),
            Err(NotifyError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_body_format_parse() {
        assert_eq!("HTML".parse::<BodyFormat>().unwrap(), BodyFormat::Html);
        assert_eq!("text".parse::<BodyFormat>().unwrap(), BodyFormat::Text);
        assert!("markdown".parse::<BodyFormat>().is_err());
    }

    #[test]
    fn test_html_lines_escape_values() {
        let formatter = Formatter::new(EventSource::CodePipeline, BodyFormat::Html);
        let payload = pipeline_payload(json!({
            "state": "FAILED",
            "pipeline": "<script>",
            "execution-id": "e1",
            "start-time": "t"
        }));

        let body = formatter.render(&payload).unwrap().unwrap().body;
        assert!(body.starts_with("<strong>Account:</strong> 111111111111<br/>\r\n"));
        assert!(body.contains("<strong>Pipeline:</strong> &lt;script&gt;<br/>\r\n"));
    }

    #[test]
    fn test_missing_start_time_renders_empty() {
        let formatter = Formatter::new(EventSource::CodePipeline, BodyFormat::Text);
        let payload = pipeline_payload(json!({
            "state": "STARTED",
            "pipeline": "demo",
            "execution-id": "e1"
        }));

        let body = formatter.render(&payload).unwrap().unwrap().body;
        assert!(body.contains("Start Time: \r\n"));
    }

    #[test]
    fn test_pipeline_hint_is_fixed() {
        let formatter = Formatter::new(EventSource::CodePipeline, BodyFormat::Text)
            .pipeline_log_hint(PipelineLogHint {
                log_group: "/aws/codebuild/deploy".into(),
                stream_prefix: "deploy/".into(),
            });

        for state in ["STARTED", "SUCCEEDED", "FAILED"] {
            let payload = pipeline_payload(json!({
                "state": state,
                "pipeline": "demo",
                "execution-id": "e1",
                "start-time": "t"
            }));
            let body = formatter.render(&payload).unwrap().unwrap().body;
            assert!(body.ends_with(
                "Follow in Cloudwatch:\r\n\
                 aws logs tail /aws/codebuild/deploy --log-stream-name-prefix deploy/ --follow --since 1h\r\n"
            ));
        }
    }

    #[test]
    fn test_subject_override() {
        let formatter =
            Formatter::new(EventSource::CodePipeline, BodyFormat::Text).subject("CodePipeline Status Alerts");
        let payload = pipeline_payload(json!({
            "state": "STOPPED",
            "pipeline": "demo",
            "execution-id": "e1"
        }));

        let notification = formatter.render(&payload).unwrap().unwrap();
        assert_eq!(notification.subject, "CodePipeline Status Alerts");
        assert_eq!(notification.status, "STOPPED");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a & 'b' \"c\""), "a &amp; &#x27;b&#x27; &quot;c&quot;");
    }
}
