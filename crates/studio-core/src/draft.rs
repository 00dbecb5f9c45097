//! Draft persistence for an in-progress publish configuration.
//!
//! The host saves one snapshot under a fixed key before the page unloads.
//! The next load consumes it: the key is deleted on read whether or not the
//! draft belongs to the project being opened.

use std::future::Future;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use studio_types::draft::PublishDraft;
use studio_types::error::RepositoryError;

use crate::session::PublishSession;

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// Key/value string storage for client-persisted state.
///
/// Uses RPITIT consistent with the other async traits of the workspace.
pub trait DraftStorage: Send + Sync {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Insert or overwrite.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// No-op when the key is absent.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Process-local storage, for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryDraftStorage {
    entries: DashMap<String, String>,
}

impl MemoryDraftStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStorage for MemoryDraftStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot / restore
// ---------------------------------------------------------------------------

/// Capture the user-editable part of a session.
pub fn snapshot(session: &PublishSession) -> PublishDraft {
    PublishDraft {
        project_id: session.project_id.clone(),
        version_number: session.version_number.clone(),
        version_description: session.version_description.clone(),
        selected_connector_ids: session.selected_connector_ids.clone(),
        union_selections: session.union_selections.clone(),
        social_platform_chatflow: session.social_platform_chatflow.clone(),
        sdk_chatflows: session.connector_publish_config.clone(),
        saved_at: Utc::now(),
    }
}

/// Apply a draft to a session that has not loaded its catalog yet.
pub fn restore(session: PublishSession, draft: PublishDraft) -> PublishSession {
    session.with_draft(draft)
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// One-shot save/load of the pending publish draft.
pub struct DraftPersistence<S> {
    storage: S,
    key: String,
}

impl<S: DraftStorage> DraftPersistence<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Store `draft` for `project_id`, replacing any pending draft.
    pub async fn save(&self, project_id: &str, draft: &PublishDraft) -> Result<(), RepositoryError> {
        let draft = PublishDraft {
            project_id: project_id.to_string(),
            ..draft.clone()
        };
        let json = serde_json::to_string(&draft)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize draft: {e}")))?;
        self.storage.set(&self.key, &json).await?;
        debug!(project_id, "publish draft saved");
        Ok(())
    }

    /// Consume the pending draft.
    ///
    /// Returns it only when it belongs to `project_id`. A draft for another
    /// project, or one that cannot be parsed, is discarded.
    pub async fn load(&self, project_id: &str) -> Result<Option<PublishDraft>, RepositoryError> {
        let Some(json) = self.storage.get(&self.key).await? else {
            return Ok(None);
        };
        self.storage.remove(&self.key).await?;

        let draft: PublishDraft = match serde_json::from_str(&json) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(error = %e, "discarding malformed publish draft");
                return Ok(None);
            }
        };
        if draft.project_id != project_id {
            debug!(
                draft_project_id = %draft.project_id,
                project_id,
                "discarding publish draft of another project"
            );
            return Ok(None);
        }
        info!(project_id, "restored publish draft");
        Ok(Some(draft))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use studio_types::connector::{
        ConnectorId, ConnectorPublishConfig, UnionSelections, WEB_SDK_CONNECTOR_ID,
    };
    use studio_types::draft::DRAFT_STORAGE_KEY;

    fn persistence() -> DraftPersistence<MemoryDraftStorage> {
        DraftPersistence::new(MemoryDraftStorage::new(), DRAFT_STORAGE_KEY)
    }

    fn draft() -> PublishDraft {
        PublishDraft {
            project_id: String::new(),
            version_number: "v1.0.1".to_string(),
            version_description: "typo fixes".to_string(),
            selected_connector_ids: vec![ConnectorId::from("a"), ConnectorId::from("y")],
            union_selections: UnionSelections::from([("u".to_string(), ConnectorId::from("y"))]),
            social_platform_chatflow: Some(ConnectorPublishConfig::with_workflow("wf", "main")),
            sdk_chatflows: HashMap::new(),
            saved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_then_load_same_project() {
        let p = persistence();
        p.save("p-1", &draft()).await.unwrap();

        let loaded = p.load("p-1").await.unwrap().unwrap();
        assert_eq!(
            loaded,
            PublishDraft {
                project_id: "p-1".to_string(),
                ..draft()
            }
        );

        // Consumed on read.
        assert!(p.load("p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_every_field() {
        let p = persistence();
        let saved = PublishDraft {
            project_id: "p-1".to_string(),
            version_description: String::new(),
            selected_connector_ids: vec![
                ConnectorId::from(WEB_SDK_CONNECTOR_ID),
                ConnectorId::from("x"),
            ],
            union_selections: UnionSelections::from([
                ("u".to_string(), ConnectorId::from("x")),
                ("v".to_string(), ConnectorId::from("v2")),
            ]),
            social_platform_chatflow: None,
            sdk_chatflows: HashMap::from([
                (
                    ConnectorId::from(WEB_SDK_CONNECTOR_ID),
                    ConnectorPublishConfig::with_workflow("wf-sdk", "sdk flow"),
                ),
                (
                    ConnectorId::from("api"),
                    ConnectorPublishConfig::with_workflow("wf-api", "api flow"),
                ),
            ]),
            ..draft()
        };
        p.save("p-1", &saved).await.unwrap();

        let loaded = p.load("p-1").await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.sdk_chatflows.len(), 2);
        assert!(loaded.social_platform_chatflow.is_none());
    }

    #[tokio::test]
    async fn test_load_other_project_discards_draft() {
        let p = persistence();
        p.save("p-1", &draft()).await.unwrap();

        assert!(p.load("p-2").await.unwrap().is_none());
        assert!(p.load("p-1").await.unwrap().is_none());
        assert!(p.storage().get(DRAFT_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let p = persistence();
        p.storage().set(DRAFT_STORAGE_KEY, "{not json").await.unwrap();
        assert!(p.load("p-1").await.unwrap().is_none());
        assert!(p.storage().get(DRAFT_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_save_replaces_first() {
        let p = persistence();
        p.save("p-1", &draft()).await.unwrap();
        p.save("p-2", &draft()).await.unwrap();
        assert!(p.load("p-1").await.unwrap().is_none());
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let mut session = PublishSession::new("p-1");
        session.version_number = "v3.0.0".to_string();
        session.version_description = "big one".to_string();
        session.selected_connector_ids = vec![ConnectorId::from("a")];
        session.social_platform_chatflow = Some(ConnectorPublishConfig::with_workflow("wf", "m"));

        let restored = restore(PublishSession::new("p-1"), snapshot(&session));
        assert!(restored.restored_from_draft);
        assert_eq!(snapshot(&restored), snapshot(&session));
    }
}
