//! Publish session state.
//!
//! `PublishSession` is the single owned state object of a publish page:
//! catalog data from the backend plus everything the user has chosen. Every
//! transition consumes the session and returns the next one, and
//! `PublishSession::apply` is the one mutation entry point that re-derives
//! the selection from readiness after each change. `SessionStore` shares a
//! session between the engine parts by whole-object replacement.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use studio_types::connector::{
    ConfigStatus, Connector, ConnectorClassification, ConnectorId, ConnectorListing,
    ConnectorPublishConfig, LastPublishInfo, SelectedWorkflow, UnionInfo, UnionSelections,
};
use studio_types::draft::PublishDraft;
use studio_types::version::suggest_next_version;

use crate::catalog::{self, ConnectorGroup};
use crate::readiness::{self, Readiness};

/// All state of one publish page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishSession {
    pub project_id: String,
    pub connectors: Vec<Connector>,
    pub unions: HashMap<String, UnionInfo>,
    pub last_publish: LastPublishInfo,
    pub union_selections: UnionSelections,
    /// Ordered, without duplicates.
    pub selected_connector_ids: Vec<ConnectorId>,
    /// Per-connector publish config (Web SDK chat-flow, extension workflows).
    pub connector_publish_config: HashMap<ConnectorId, ConnectorPublishConfig>,
    /// Chat-flow shared by all social platform connectors.
    pub social_platform_chatflow: Option<ConnectorPublishConfig>,
    /// Store listing configuration per store connector.
    pub store_configs: HashMap<ConnectorId, HashMap<String, String>>,
    pub template_configured: bool,
    pub version_number: String,
    pub version_description: String,
    /// Set once `with_catalog` has run.
    pub catalog_loaded: bool,
    /// Set when a draft was applied; catalog defaults then stay out of the way.
    pub restored_from_draft: bool,
}

impl PublishSession {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// The one mutation entry point: apply a transition, then reconcile the
    /// selection against readiness.
    pub fn apply(self, f: impl FnOnce(PublishSession) -> PublishSession) -> PublishSession {
        readiness::reconcile_selection(f(self))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn connector(&self, id: &ConnectorId) -> Option<&Connector> {
        self.connectors.iter().find(|c| &c.id == id)
    }

    pub fn is_selected(&self, id: &ConnectorId) -> bool {
        self.selected_connector_ids.contains(id)
    }

    pub fn readiness(&self, id: &ConnectorId) -> Option<Readiness> {
        self.connector(id).map(|c| readiness::evaluate(c, self))
    }

    /// Catalog groups for display, using the current union selections.
    pub fn groups(&self) -> Vec<ConnectorGroup> {
        catalog::build_groups(
            &self.connectors,
            &self.unions,
            &self.union_selections,
            &self.last_publish,
        )
    }

    /// Selected connectors, in selection order.
    pub fn selected_connectors(&self) -> impl Iterator<Item = &Connector> {
        self.selected_connector_ids
            .iter()
            .filter_map(|id| self.connector(id))
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Install the connector listing.
    ///
    /// Startup defaults (union selections, preselection from the last
    /// publish, chat-flows, suggested version) only fill fields a restored
    /// draft left untouched.
    pub fn with_catalog(self, listing: ConnectorListing) -> Self {
        let ConnectorListing {
            connector_list,
            connector_union_info_map,
            last_publish_info,
        } = listing;

        let mut next = Self {
            connectors: connector_list,
            unions: connector_union_info_map,
            last_publish: last_publish_info,
            catalog_loaded: true,
            ..self
        };

        let defaults =
            catalog::default_union_selections(&next.connectors, &next.unions, &next.last_publish);
        for (union_id, member) in defaults {
            next.union_selections.entry(union_id).or_insert(member);
        }

        if next.restored_from_draft {
            return next.with_union_members_resolved();
        }

        next.selected_connector_ids = catalog::default_selected_ids(
            &next.connectors,
            &next.unions,
            &next.union_selections,
            &next.last_publish,
        );
        for (id, config) in &next.last_publish.connector_publish_config {
            let Some(connector) = next.connector(id) else {
                continue;
            };
            if connector.classification == ConnectorClassification::SocialPlatform {
                if next.social_platform_chatflow.is_none() && config.first_workflow_id().is_some() {
                    next.social_platform_chatflow = Some(config.clone());
                }
            } else {
                next.connector_publish_config
                    .entry(id.clone())
                    .or_insert_with(|| config.clone());
            }
        }
        if next.version_number.is_empty() {
            next.version_number = suggest_next_version(&next.last_publish.version_number);
        }
        next
    }

    /// Apply a restored draft. Must run before `with_catalog` to win over
    /// the catalog defaults.
    pub fn with_draft(self, draft: PublishDraft) -> Self {
        Self {
            version_number: draft.version_number,
            version_description: draft.version_description,
            selected_connector_ids: dedup(draft.selected_connector_ids),
            union_selections: draft.union_selections,
            social_platform_chatflow: draft.social_platform_chatflow,
            connector_publish_config: draft.sdk_chatflows,
            restored_from_draft: true,
            ..self
        }
    }

    /// Select a connector, or the effective member of its union.
    ///
    /// Selecting a union member first removes every other member of the same
    /// union. A connector that is currently disabled is refused.
    pub fn select_connector(self, id: &ConnectorId) -> Self {
        let Some(target) = self.effective_for(id) else {
            tracing::debug!(connector_id = %id, "ignoring selection of unknown connector");
            return self;
        };
        let ready = self
            .connector(&target)
            .is_some_and(|c| readiness::evaluate(c, &self).is_ready());
        if !ready {
            tracing::debug!(connector_id = %target, "ignoring selection of disabled connector");
            return self;
        }
        let mut next = self.without_union_of(id);
        if !next.selected_connector_ids.contains(&target) {
            next.selected_connector_ids.push(target);
        }
        next
    }

    /// Deselect a connector; for a union member, the whole union slot.
    pub fn deselect_connector(self, id: &ConnectorId) -> Self {
        let mut next = self.without_union_of(id);
        next.selected_connector_ids.retain(|s| s != id);
        next
    }

    /// Change which member stands in for a union. If the union slot was
    /// selected, the selection moves to the new member.
    pub fn select_union_member(self, union_id: &str, member: ConnectorId) -> Self {
        let members: HashSet<ConnectorId> = catalog::union_members(&self.connectors, union_id)
            .into_iter()
            .map(|c| c.id.clone())
            .collect();
        if !members.contains(&member) {
            tracing::debug!(union_id, connector_id = %member, "not a member of union");
            return self;
        }
        let was_selected = self
            .selected_connector_ids
            .iter()
            .any(|id| members.contains(id));

        let mut next = self;
        next.union_selections
            .insert(union_id.to_string(), member.clone());
        if was_selected {
            next.selected_connector_ids.retain(|id| !members.contains(id));
            next.selected_connector_ids.push(member);
        }
        next
    }

    pub fn with_social_chatflow(self, chatflow: Option<ConnectorPublishConfig>) -> Self {
        Self {
            social_platform_chatflow: chatflow,
            ..self
        }
    }

    pub fn with_connector_chatflow(
        mut self,
        connector_id: ConnectorId,
        config: ConnectorPublishConfig,
    ) -> Self {
        self.connector_publish_config.insert(connector_id, config);
        self
    }

    pub fn with_store_config(
        mut self,
        connector_id: ConnectorId,
        config: HashMap<String, String>,
    ) -> Self {
        self.store_configs.insert(connector_id, config);
        self
    }

    pub fn with_template_configured(self, configured: bool) -> Self {
        Self {
            template_configured: configured,
            ..self
        }
    }

    pub fn with_version(
        self,
        version_number: impl Into<String>,
        version_description: impl Into<String>,
    ) -> Self {
        Self {
            version_number: version_number.into(),
            version_description: version_description.into(),
            ..self
        }
    }

    /// Swap in an updated connector (wizard result, unbind).
    pub fn with_connector_replaced(mut self, connector: Connector) -> Self {
        match self.connectors.iter_mut().find(|c| c.id == connector.id) {
            Some(slot) => *slot = connector,
            None => tracing::debug!(connector_id = %connector.id, "replacing unknown connector"),
        }
        self
    }

    /// Store the workflows chosen for an extension library connector. The
    /// connector becomes configured and is selected.
    pub fn with_extension_workflows(
        mut self,
        connector_id: &ConnectorId,
        workflows: Vec<SelectedWorkflow>,
    ) -> Self {
        let Some(index) = self.connectors.iter().position(|c| &c.id == connector_id) else {
            tracing::debug!(connector_id = %connector_id, "workflows for unknown connector");
            return self;
        };
        self.connectors[index].config_status = ConfigStatus::Configured;
        self.connector_publish_config.insert(
            connector_id.clone(),
            ConnectorPublishConfig {
                selected_workflows: Some(workflows),
            },
        );
        if !self.selected_connector_ids.contains(connector_id) {
            self.selected_connector_ids.push(connector_id.clone());
        }
        self
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn effective_for(&self, id: &ConnectorId) -> Option<ConnectorId> {
        let connector = self.connector(id)?;
        match catalog::union_of(connector, &self.unions) {
            Some(union_id) => catalog::resolve_union_member(
                union_id,
                &self.connectors,
                &self.unions,
                &self.union_selections,
                &self.last_publish,
            )
            .map(|c| c.id.clone()),
            None => Some(connector.id.clone()),
        }
    }

    /// Replace every selected union member by its union's effective member,
    /// so a restored selection holds at most one member per union.
    fn with_union_members_resolved(self) -> Self {
        let resolved: Vec<ConnectorId> = self
            .selected_connector_ids
            .iter()
            .map(|id| self.effective_for(id).unwrap_or_else(|| id.clone()))
            .collect();
        let resolved = dedup(resolved);
        if resolved != self.selected_connector_ids {
            tracing::debug!(
                before = self.selected_connector_ids.len(),
                after = resolved.len(),
                "collapsed restored union members onto the effective member"
            );
        }
        Self {
            selected_connector_ids: resolved,
            ..self
        }
    }

    fn without_union_of(mut self, id: &ConnectorId) -> Self {
        let union_id = self
            .connector(id)
            .and_then(|c| catalog::union_of(c, &self.unions))
            .map(str::to_string);
        if let Some(union_id) = union_id {
            let members: HashSet<ConnectorId> = catalog::union_members(&self.connectors, &union_id)
                .into_iter()
                .map(|c| c.id.clone())
                .collect();
            self.selected_connector_ids.retain(|s| !members.contains(s));
        }
        self
    }
}

fn dedup(ids: Vec<ConnectorId>) -> Vec<ConnectorId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

// ---------------------------------------------------------------------------
// Shared store
// ---------------------------------------------------------------------------

/// Shared holder of the current session.
///
/// Readers get a snapshot; writers replace the whole object through
/// `PublishSession::apply`, so readiness and selection never diverge.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Mutex<PublishSession>,
}

impl SessionStore {
    pub fn new(session: PublishSession) -> Self {
        Self {
            current: Mutex::new(session),
        }
    }

    pub fn snapshot(&self) -> PublishSession {
        self.lock().clone()
    }

    /// Apply a transition and return the resulting session.
    ///
    /// The stored session is replaced only once `f` returns; a panicking
    /// transition leaves the previous session in place.
    pub fn apply(&self, f: impl FnOnce(PublishSession) -> PublishSession) -> PublishSession {
        let mut guard = self.lock();
        let next = guard.clone().apply(f);
        *guard = next.clone();
        next
    }

    // The session is never left half-written, so a poisoned lock still
    // guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, PublishSession> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
