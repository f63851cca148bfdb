//! CodeBuild and CodePipeline event payloads.
//!
//! Events arrive as the JSON string inside an SNS message. The envelope
//! fields are shared; `detail` is decoded according to the event source the
//! deployment handles.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::NotifyError;

/// Decoded event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPayload {
    /// Emitting service, e.g. `aws.codebuild`.
    pub source: String,
    pub account: String,
    pub region: String,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    /// Event time (top-level in EventBridge events).
    #[serde(default)]
    pub time: Option<String>,
    /// Source-specific detail, decoded lazily.
    pub detail: Value,
}

impl EventPayload {
    /// Parse a raw SNS message body.
    pub fn parse(raw: &str) -> Result<Self, NotifyError> {
        serde_json::from_str(raw).map_err(|e| NotifyError::Decode(e.to_string()))
    }

    /// Decode `detail` as a CodeBuild state change.
    pub fn build_detail(&self) -> Result<BuildDetail, NotifyError> {
        BuildDetail::deserialize(&self.detail)
            .map_err(|e| NotifyError::Decode(format!("detail: {}", e)))
    }

    /// Decode `detail` as a CodePipeline execution state change.
    pub fn pipeline_detail(&self) -> Result<PipelineDetail, NotifyError> {
        PipelineDetail::deserialize(&self.detail)
            .map_err(|e| NotifyError::Decode(format!("detail: {}", e)))
    }
}

/// `detail` of a CodeBuild "Build State Change" event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildDetail {
    pub build_status: String,
    pub project_name: String,
    pub build_id: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub execution_trigger: Option<ExecutionTrigger>,
    #[serde(default)]
    pub additional_information: Option<AdditionalInformation>,
}

impl BuildDetail {
    /// CloudWatch log location, once the build has started logging.
    pub fn logs(&self) -> Option<&LogLocation> {
        self.additional_information.as_ref()?.logs.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdditionalInformation {
    #[serde(default)]
    pub logs: Option<LogLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogLocation {
    pub group_name: Option<String>,
    pub stream_name: Option<String>,
}

/// `detail` of a CodePipeline "Pipeline Execution State Change" event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineDetail {
    pub state: String,
    pub pipeline: String,
    pub execution_id: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub execution_trigger: Option<ExecutionTrigger>,
}

/// What started an execution.
///
/// An object carrying a non-null `trigger-type` key is [`Generic`]; any other
/// object is a source-control [`Push`].
///
/// [`Generic`]: ExecutionTrigger::Generic
/// [`Push`]: ExecutionTrigger::Push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionTrigger {
    Generic(GenericTrigger),
    Push(PushTrigger),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GenericTrigger {
    pub trigger_type: String,
    #[serde(default)]
    pub trigger_detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PushTrigger {
    pub author_display_name: Option<String>,
    pub author_email: Option<String>,
    pub full_repository_name: Option<String>,
    pub branch_name: Option<String>,
    pub author_date: Option<String>,
    pub commit_message: Option<String>,
}

impl<'de> Deserialize<'de> for ExecutionTrigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        let generic = map.get("trigger-type").is_some_and(|v| !v.is_null());
        let value = Value::Object(map);

        if generic {
            GenericTrigger::deserialize(value)
                .map(Self::Generic)
                .map_err(de::Error::custom)
        } else {
            PushTrigger::deserialize(value)
                .map(Self::Push)
                .map_err(de::Error::custom)
        }
    }
}
