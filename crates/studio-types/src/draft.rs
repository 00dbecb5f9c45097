//! Client-persisted snapshot of an in-progress publish configuration.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connector::{ConnectorId, ConnectorPublishConfig, UnionSelections};

/// Storage key under which the single pending draft lives.
pub const DRAFT_STORAGE_KEY: &str = "project_publish_draft";

/// The minimum mutable state needed to resume a publish configuration.
///
/// `saved_at` is informational and excluded from equality so a round-trip
/// compares only user input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDraft {
    pub project_id: String,
    #[serde(default)]
    pub version_number: String,
    #[serde(default)]
    pub version_description: String,
    #[serde(default)]
    pub selected_connector_ids: Vec<ConnectorId>,
    #[serde(default)]
    pub union_selections: UnionSelections,
    /// Chat-flow shared by every social platform connector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_platform_chatflow: Option<ConnectorPublishConfig>,
    /// Per-connector chat-flow choices (Web SDK and friends).
    #[serde(default)]
    pub sdk_chatflows: HashMap<ConnectorId, ConnectorPublishConfig>,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

impl PartialEq for PublishDraft {
    fn eq(&self, other: &Self) -> bool {
        self.project_id == other.project_id
            && self.version_number == other.version_number
            && self.version_description == other.version_description
            && self.selected_connector_ids == other.selected_connector_ids
            && self.union_selections == other.union_selections
            && self.social_platform_chatflow == other.social_platform_chatflow
            && self.sdk_chatflows == other.sdk_chatflows
    }
}
