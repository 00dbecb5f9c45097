//! Channel readiness: whether a connector may be selected for publishing.
//!
//! Evaluation is a pure function of the connector and the current session.
//! Reasons are checked in a fixed priority order and only the first one
//! found is reported.

use std::fmt;

use studio_types::connector::{
    BindType, ConfigStatus, Connector, ConnectorClassification, STORE_REQUIRED_FIELDS,
};

use crate::session::PublishSession;

/// Why a connector cannot be selected right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledReason {
    /// Social platform connectors share one chat-flow and none is chosen.
    SocialPlatformChatflowMissing,
    /// The connector needs a binding and has never been configured.
    NotConfigured,
    /// The backend refused publishing; carries its reason when it sent one.
    NotAllowed(Option<String>),
    /// Template metadata has not been confirmed.
    TemplateNotConfirmed,
    /// The Web SDK target has no chat-flow.
    WebSdkChatflowMissing,
    /// Store listing fields (display screen, category) are unset.
    StoreFieldsMissing,
}

impl DisabledReason {
    /// Default user-facing text.
    pub fn message(&self) -> String {
        match self {
            DisabledReason::SocialPlatformChatflowMissing => {
                "Select a chat-flow for social platforms first".to_string()
            }
            DisabledReason::NotConfigured => "Configure the connector before publishing".to_string(),
            DisabledReason::NotAllowed(Some(reason)) if !reason.is_empty() => reason.clone(),
            DisabledReason::NotAllowed(_) => "Publishing to this connector is not allowed".to_string(),
            DisabledReason::TemplateNotConfirmed => {
                "Fill in the template information first".to_string()
            }
            DisabledReason::WebSdkChatflowMissing => "Select a chat-flow for the Web SDK".to_string(),
            DisabledReason::StoreFieldsMissing => {
                "Set the display screen and category for the store".to_string()
            }
        }
    }

    /// Whether the whole card is greyed out, not just its checkbox.
    pub fn disables_card(&self) -> bool {
        matches!(self, DisabledReason::SocialPlatformChatflowMissing)
    }
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Result of evaluating one connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Disabled(DisabledReason),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    pub fn reason(&self) -> Option<&DisabledReason> {
        match self {
            Readiness::Ready => None,
            Readiness::Disabled(reason) => Some(reason),
        }
    }

    pub fn message(&self) -> Option<String> {
        self.reason().map(DisabledReason::message)
    }
}

fn store_fields_set(connector: &Connector, session: &PublishSession) -> bool {
    let Some(config) = session.store_configs.get(&connector.id) else {
        return false;
    };
    STORE_REQUIRED_FIELDS
        .iter()
        .all(|key| config.get(*key).is_some_and(|v| !v.trim().is_empty()))
}

/// Evaluate a connector against the session.
pub fn evaluate(connector: &Connector, session: &PublishSession) -> Readiness {
    let social_chatflow = session
        .social_platform_chatflow
        .as_ref()
        .and_then(|c| c.first_workflow_id());
    if connector.classification == ConnectorClassification::SocialPlatform
        && social_chatflow.is_none()
    {
        return Readiness::Disabled(DisabledReason::SocialPlatformChatflowMissing);
    }

    if connector.bind_type.requires_binding()
        && connector.config_status == ConfigStatus::NotConfigured
    {
        return Readiness::Disabled(DisabledReason::NotConfigured);
    }

    if !connector.allow_publish {
        return Readiness::Disabled(DisabledReason::NotAllowed(
            connector.not_allow_publish_reason.clone(),
        ));
    }

    if connector.is_template() && !session.template_configured {
        return Readiness::Disabled(DisabledReason::TemplateNotConfirmed);
    }

    if connector.is_web_sdk() {
        let chatflow = session
            .connector_publish_config
            .get(&connector.id)
            .and_then(|c| c.first_workflow_id());
        if chatflow.is_none() {
            return Readiness::Disabled(DisabledReason::WebSdkChatflowMissing);
        }
    }

    if connector.bind_type == BindType::StoreBind && !store_fields_set(connector, session) {
        return Readiness::Disabled(DisabledReason::StoreFieldsMissing);
    }

    Readiness::Ready
}

/// Drop every selected connector that is no longer eligible.
///
/// Before the catalog has loaded there is nothing to evaluate against, so
/// the selection (possibly restored from a draft) is left alone.
pub fn reconcile_selection(session: PublishSession) -> PublishSession {
    if !session.catalog_loaded {
        return session;
    }
    let keep: Vec<_> = session
        .selected_connector_ids
        .iter()
        .filter(|id| {
            session
                .connector(id)
                .is_some_and(|c| evaluate(c, &session).is_ready())
        })
        .cloned()
        .collect();
    if keep.len() != session.selected_connector_ids.len() {
        tracing::debug!(
            dropped = session.selected_connector_ids.len() - keep.len(),
            "removed ineligible connectors from selection"
        );
    }
    PublishSession {
        selected_connector_ids: keep,
        ..session
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::{connector, loaded_session};
    use studio_types::connector::{
        ConnectorId, ConnectorPublishConfig, TEMPLATE_CONNECTOR_ID, WEB_SDK_CONNECTOR_ID,
    };

    #[test]
    fn test_social_platform_needs_shared_chatflow() {
        let discord = connector("d", ConnectorClassification::SocialPlatform, BindType::KvBind);
        let session = loaded_session(vec![discord.clone()]);

        let readiness = evaluate(&discord, &session);
        assert_eq!(
            readiness,
            Readiness::Disabled(DisabledReason::SocialPlatformChatflowMissing)
        );
        assert!(readiness.reason().unwrap().disables_card());

        let session = session.with_social_chatflow(Some(ConnectorPublishConfig::with_workflow(
            "wf-1", "support",
        )));
        assert!(evaluate(&discord, &session).is_ready());
    }

    #[test]
    fn test_social_reason_takes_priority_over_not_configured() {
        let mut discord = connector("d", ConnectorClassification::SocialPlatform, BindType::KvBind);
        discord.config_status = ConfigStatus::NotConfigured;
        let session = loaded_session(vec![discord.clone()]);
        assert_eq!(
            evaluate(&discord, &session).reason(),
            Some(&DisabledReason::SocialPlatformChatflowMissing)
        );
    }

    #[test]
    fn test_bind_required_and_not_configured() {
        let mut lark = connector("l", ConnectorClassification::MiniProgram, BindType::KvAuthBind);
        lark.config_status = ConfigStatus::NotConfigured;
        let session = loaded_session(vec![lark.clone()]);
        assert_eq!(
            evaluate(&lark, &session),
            Readiness::Disabled(DisabledReason::NotConfigured)
        );

        // A bind type that needs no binding is never blocked by config status.
        let mut api = connector("api", ConnectorClassification::ApiOrSdk, BindType::ApiBind);
        api.config_status = ConfigStatus::NotConfigured;
        assert!(evaluate(&api, &session).is_ready());
    }

    #[test]
    fn test_not_allowed_uses_backend_reason_or_generic_text() {
        let mut c = connector("c", ConnectorClassification::MiniProgram, BindType::KvBind);
        c.allow_publish = false;
        c.not_allow_publish_reason = Some("workspace quota reached".to_string());
        let session = loaded_session(vec![c.clone()]);
        let readiness = evaluate(&c, &session);
        assert_eq!(readiness.message().unwrap(), "workspace quota reached");

        c.not_allow_publish_reason = None;
        let readiness = evaluate(&c, &session);
        assert!(!readiness.is_ready());
        assert_eq!(
            readiness.message().unwrap(),
            "Publishing to this connector is not allowed"
        );
    }

    #[test]
    fn test_template_requires_confirmation() {
        let template = connector(
            TEMPLATE_CONNECTOR_ID,
            ConnectorClassification::FirstPartyStore,
            BindType::TemplateBind,
        );
        let session = loaded_session(vec![template.clone()]);
        assert_eq!(
            evaluate(&template, &session),
            Readiness::Disabled(DisabledReason::TemplateNotConfirmed)
        );
        let session = session.with_template_configured(true);
        assert!(evaluate(&template, &session).is_ready());
    }

    #[test]
    fn test_web_sdk_requires_its_own_chatflow() {
        let sdk = connector(
            WEB_SDK_CONNECTOR_ID,
            ConnectorClassification::ApiOrSdk,
            BindType::WebSdkBind,
        );
        let session = loaded_session(vec![sdk.clone()]);
        assert_eq!(
            evaluate(&sdk, &session),
            Readiness::Disabled(DisabledReason::WebSdkChatflowMissing)
        );

        let session = session.with_connector_chatflow(
            ConnectorId::from(WEB_SDK_CONNECTOR_ID),
            ConnectorPublishConfig::with_workflow("wf-2", "faq"),
        );
        assert!(evaluate(&sdk, &session).is_ready());
    }

    #[test]
    fn test_store_requires_display_screen_and_category() {
        let store = connector("s", ConnectorClassification::FirstPartyStore, BindType::StoreBind);
        let session = loaded_session(vec![store.clone()]);
        assert_eq!(
            evaluate(&store, &session),
            Readiness::Disabled(DisabledReason::StoreFieldsMissing)
        );

        let partial = session.clone().with_store_config(
            store.id.clone(),
            HashMap::from([("display_screen".to_string(), "web".to_string())]),
        );
        assert!(!evaluate(&store, &partial).is_ready());

        let full = session.with_store_config(
            store.id.clone(),
            HashMap::from([
                ("display_screen".to_string(), "web".to_string()),
                ("category".to_string(), "tools".to_string()),
            ]),
        );
        assert!(evaluate(&store, &full).is_ready());
    }

    #[test]
    fn test_reconcile_drops_newly_disabled_selection() {
        let discord = connector("d", ConnectorClassification::SocialPlatform, BindType::KvBind);
        let api = connector("api", ConnectorClassification::ApiOrSdk, BindType::ApiBind);
        let session = loaded_session(vec![discord.clone(), api.clone()])
            .with_social_chatflow(Some(ConnectorPublishConfig::with_workflow("wf", "main")))
            .select_connector(&discord.id)
            .select_connector(&api.id);
        assert_eq!(session.selected_connector_ids.len(), 2);

        // Clearing the shared chat-flow through the mutation entry point
        // unselects the social connector.
        let session = session.apply(|s| s.with_social_chatflow(None));
        assert_eq!(session.selected_connector_ids, vec![api.id.clone()]);
    }

    #[test]
    fn test_reconcile_leaves_selection_alone_before_catalog() {
        let mut session = PublishSession::new("p-1");
        session.selected_connector_ids = vec![ConnectorId::from("restored")];
        let session = reconcile_selection(session);
        assert_eq!(session.selected_connector_ids.len(), 1);
    }
}
