use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::{ConnectorId, ConnectorPublishConfig};

/// Project-level phase of a publish record.
///
/// Declaration order follows the pipeline, so `<` compares progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishRecordStatus {
    Packing,
    PackFailed,
    Auditing,
    AuditNotPass,
    ConnectorPublishing,
    PublishDone,
}

impl PublishRecordStatus {
    /// Project-level terminal failure.
    pub fn is_failure(self) -> bool {
        matches!(self, PublishRecordStatus::PackFailed | PublishRecordStatus::AuditNotPass)
    }
}

impl fmt::Display for PublishRecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishRecordStatus::Packing => "packing",
            PublishRecordStatus::PackFailed => "pack_failed",
            PublishRecordStatus::Auditing => "auditing",
            PublishRecordStatus::AuditNotPass => "audit_not_pass",
            PublishRecordStatus::ConnectorPublishing => "connector_publishing",
            PublishRecordStatus::PublishDone => "publish_done",
        };
        f.write_str(s)
    }
}

/// Delivery state of one connector inside a publish record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorPublishStatus {
    #[default]
    Default,
    Auditing,
    Failed,
    Success,
    Disable,
}

impl ConnectorPublishStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, ConnectorPublishStatus::Default | ConnectorPublishStatus::Auditing)
    }
}

impl fmt::Display for ConnectorPublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorPublishStatus::Default => "default",
            ConnectorPublishStatus::Auditing => "auditing",
            ConnectorPublishStatus::Failed => "failed",
            ConnectorPublishStatus::Success => "success",
            ConnectorPublishStatus::Disable => "disable",
        };
        f.write_str(s)
    }
}

/// Per-connector result inside a publish record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorPublishResult {
    pub connector_id: ConnectorId,
    #[serde(default)]
    pub connector_name: String,
    #[serde(default)]
    pub connector_icon_url: String,
    pub connector_publish_status: ConnectorPublishStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub connector_bind_info: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_publish_config: Option<ConnectorPublishConfig>,
}

/// Kind of project resource that failed to package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackEntityType {
    Workflow,
    Plugin,
    Knowledge,
    Other,
}

/// One resource that blocked packaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackFailedEntity {
    pub entity_id: String,
    pub entity_name: String,
    pub entity_type: PackEntityType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishStatusDetail {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pack_failed_detail: Vec<PackFailedEntity>,
}

/// Server-tracked aggregate for one publish attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub publish_record_id: String,
    #[serde(default)]
    pub version_number: String,
    pub publish_status: PublishRecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_status_detail: Option<PublishStatusDetail>,
    #[serde(default)]
    pub connector_publish_result: Vec<ConnectorPublishResult>,
    /// `None` when the monetization call itself could not be made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_monetization_result: Option<bool>,
}

impl PublishRecord {
    pub fn result_for(&self, connector_id: &ConnectorId) -> Option<&ConnectorPublishResult> {
        self.connector_publish_result
            .iter()
            .find(|r| &r.connector_id == connector_id)
    }
}

/// Entry of the publish history selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecordSummary {
    pub id: String,
    pub version_number: String,
}

/// Body of `PublishProject`. Built once from the session, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub project_id: String,
    pub version_number: String,
    #[serde(default)]
    pub description: String,
    /// Connector id -> bind info.
    pub connectors: HashMap<ConnectorId, HashMap<String, String>>,
    #[serde(default)]
    pub connector_publish_config: HashMap<ConnectorId, ConnectorPublishConfig>,
}

/// Response of `PublishProject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub publish_record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_monetization_result: Option<bool>,
}

/// Which record `GetPublishRecordDetail` should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLookup {
    ById(String),
    /// Latest record of the project.
    Latest,
}

/// Client-side classification of a whole publish batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    Publishing,
    Failed,
    Success,
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateStatus::Publishing => write!(f, "publishing"),
            AggregateStatus::Failed => write!(f, "failed"),
            AggregateStatus::Success => write!(f, "success"),
        }
    }
}
