//! Binding wizard state machine.
//!
//! A `BindingWizard` drives one `WizardSession` through the backend-defined
//! pages of a connector. Each `advance` validates the submitted values,
//! runs the page's server action and either moves to the next page,
//! completes with a `BindOutcome`, or hands off to the `AuthRedirector`.
//! Only one step runs at a time; results arriving after `close` are dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use studio_types::connector::{BindType, ConfigStatus, Connector};
use studio_types::error::{ApiError, WizardError};
use studio_types::wizard::{BindScope, OAuthRedirect, StepAction, WizardPage};

use crate::api::{AuthRedirector, PublishApi};

use super::form::{render_copy_link, validate_values};

/// Lifecycle of a wizard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Active,
    Done,
    Redirected,
    Cancelled,
}

/// Label of the primary button for the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Next,
    Save,
    Complete,
}

/// Ephemeral state of one open wizard.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardSession {
    pub id: Uuid,
    pub connector: Connector,
    pub title_text: String,
    pub guide: Option<String>,
    pub pages: Vec<WizardPage>,
    pub step: usize,
    pub field_values: HashMap<String, String>,
    pub last_error: Option<WizardError>,
    pub bind_id: Option<String>,
    pub phase: WizardPhase,
}

impl WizardSession {
    pub fn current_page(&self) -> Option<&WizardPage> {
        self.pages.get(self.step)
    }

    fn current_action(&self) -> StepAction {
        self.current_page().map(|p| p.action).unwrap_or_default()
    }

    pub fn is_last_step(&self) -> bool {
        self.step + 1 >= self.pages.len()
    }

    /// Whether a Back control should be offered.
    pub fn can_go_back(&self) -> bool {
        self.step > 0 && self.current_action() != StepAction::NotQuery
    }

    pub fn primary_action(&self) -> PrimaryAction {
        match (self.is_last_step(), self.current_action()) {
            (false, _) => PrimaryAction::Next,
            (true, StepAction::NotQuery) => PrimaryAction::Complete,
            (true, _) => PrimaryAction::Save,
        }
    }

    /// Copy-link lines of the current page with placeholders filled in.
    pub fn copy_links(&self) -> Vec<String> {
        self.current_page()
            .and_then(|p| p.copy_link_area.as_ref())
            .map(|area| {
                area.link_list
                    .iter()
                    .map(|t| render_copy_link(t, &self.field_values))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Result of a completed wizard, written back into the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct BindOutcome {
    pub connector: Connector,
    pub bind_id: Option<String>,
}

/// What a call to `advance` did.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Advanced { step: usize },
    Completed(BindOutcome),
    /// Control passed to the authorization page; the session is over.
    Redirected(OAuthRedirect),
    /// Validation or the step action failed; the step did not change.
    Failed(WizardError),
    /// Another step was already running.
    Ignored,
    /// The wizard was closed while the step was running.
    Discarded,
}

enum StepResult {
    Continue,
    Detail(HashMap<String, String>),
    Bound(Option<String>),
    Redirect(OAuthRedirect),
}

/// Clears the in-flight flag however the step ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Interprets a connector's wizard schema against the backend.
pub struct BindingWizard<A, R> {
    api: Arc<A>,
    redirector: Arc<R>,
    scope: BindScope,
    session: Mutex<WizardSession>,
    in_flight: AtomicBool,
}

impl<A: PublishApi, R: AuthRedirector> BindingWizard<A, R> {
    /// Fetch the schema and start at the first page.
    ///
    /// Field values start from the connector's saved `bind_info`, falling
    /// back to each field's declared default.
    pub async fn open(
        api: Arc<A>,
        redirector: Arc<R>,
        connector: Connector,
        scope: BindScope,
    ) -> Result<Self, WizardError> {
        let schema = api
            .get_wizard_schema(&connector.id, scope.agent_type)
            .await
            .map_err(|e| {
                warn!(connector_id = %connector.id, error = %e, "failed to load wizard schema");
                WizardError::SchemaUnavailable(e)
            })?;

        let pages = schema.effective_pages();
        let mut field_values = connector.bind_info.clone();
        for field in pages
            .iter()
            .filter_map(|p| p.schema_area.as_ref())
            .flat_map(|s| s.fields.iter())
        {
            if let Some(default) = &field.spec().default {
                field_values
                    .entry(field.name().to_string())
                    .or_insert_with(|| default.clone());
            }
        }

        let session = WizardSession {
            id: Uuid::now_v7(),
            bind_id: connector.bind_id.clone(),
            connector,
            title_text: schema.title_text,
            guide: schema.guide,
            pages,
            step: 0,
            field_values,
            last_error: None,
            phase: WizardPhase::Active,
        };
        info!(
            session_id = %session.id,
            connector_id = %session.connector.id,
            pages = session.pages.len(),
            "opened binding wizard"
        );

        Ok(Self {
            api,
            redirector,
            scope,
            session: Mutex::new(session),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn snapshot(&self) -> WizardSession {
        self.session
            .lock()
            .expect("wizard session lock poisoned")
            .clone()
    }

    pub fn can_go_back(&self) -> bool {
        self.snapshot().can_go_back()
    }

    pub fn primary_action(&self) -> PrimaryAction {
        self.snapshot().primary_action()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Merge `values` and run the current page's action.
    pub async fn advance(&self, values: HashMap<String, String>) -> AdvanceOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("wizard step already in flight, ignoring advance");
            return AdvanceOutcome::Ignored;
        }
        let _in_flight = InFlight(&self.in_flight);

        let (connector, step, page, field_values) = {
            let mut session = self.session.lock().expect("wizard session lock poisoned");
            if session.phase != WizardPhase::Active {
                return AdvanceOutcome::Failed(WizardError::NotActive);
            }
            session.field_values.extend(values);
            let page = session.current_page().cloned().unwrap_or_default();
            if let Err(e) = validate_values(page.schema_area.as_ref(), &session.field_values) {
                session.last_error = Some(e.clone());
                return AdvanceOutcome::Failed(e);
            }
            session.last_error = None;
            (
                session.connector.clone(),
                session.step,
                page,
                session.field_values.clone(),
            )
        };

        debug!(connector_id = %connector.id, step, action = ?page.action, "running wizard step");
        let result = self.run_action(&connector, page.action, &field_values).await;

        let mut session = self.session.lock().expect("wizard session lock poisoned");
        if session.phase != WizardPhase::Active {
            debug!(connector_id = %connector.id, step, "wizard closed during step, dropping result");
            return AdvanceOutcome::Discarded;
        }

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                warn!(connector_id = %connector.id, step, error = %e, "wizard step failed");
                let err = WizardError::Step(e);
                session.last_error = Some(err.clone());
                return AdvanceOutcome::Failed(err);
            }
        };

        match result {
            StepResult::Continue => {}
            StepResult::Detail(detail) => session.field_values.extend(detail),
            StepResult::Bound(bind_id) => {
                if bind_id.is_some() {
                    session.bind_id = bind_id;
                }
            }
            StepResult::Redirect(redirect) => {
                session.phase = WizardPhase::Redirected;
                drop(session);
                info!(connector_id = %connector.id, "handing off to authorization page");
                self.redirector.redirect(&redirect);
                return AdvanceOutcome::Redirected(redirect);
            }
        }

        if session.is_last_step() {
            session.phase = WizardPhase::Done;
            let connector = Connector {
                bind_info: session.field_values.clone(),
                bind_id: session.bind_id.clone(),
                config_status: ConfigStatus::Configured,
                ..session.connector.clone()
            };
            info!(connector_id = %connector.id, "binding wizard completed");
            return AdvanceOutcome::Completed(BindOutcome {
                connector,
                bind_id: session.bind_id.clone(),
            });
        }

        session.step += 1;
        AdvanceOutcome::Advanced { step: session.step }
    }

    /// Step back one page without any network call. Ignored while a step
    /// is running or at the first page.
    pub fn back(&self) -> usize {
        let mut session = self.session.lock().expect("wizard session lock poisoned");
        if session.phase == WizardPhase::Active && session.step > 0 && !self.is_in_flight() {
            session.step -= 1;
            session.last_error = None;
        }
        session.step
    }

    /// Discard the session. A step still running will be dropped on return.
    pub fn close(&self) {
        let mut session = self.session.lock().expect("wizard session lock poisoned");
        if session.phase == WizardPhase::Active {
            session.phase = WizardPhase::Cancelled;
            debug!(session_id = %session.id, "binding wizard closed");
        }
    }

    async fn run_action(
        &self,
        connector: &Connector,
        action: StepAction,
        values: &HashMap<String, String>,
    ) -> Result<StepResult, ApiError> {
        match action {
            StepAction::NotQuery => Ok(StepResult::Continue),
            StepAction::GetBindConfig => {
                let detail = self
                    .api
                    .get_bind_config(&connector.id, values, &self.scope)
                    .await?;
                Ok(StepResult::Detail(detail))
            }
            StepAction::SaveBindConfig => {
                self.api
                    .save_bind_config(&connector.id, values, &self.scope)
                    .await?;
                Ok(StepResult::Continue)
            }
            StepAction::BindConnector => {
                let response = self
                    .api
                    .bind_connector(&connector.id, values, &self.scope)
                    .await?;
                if connector.bind_type == BindType::KvAuthBind && response.wants_redirect() {
                    let mut params = connector.auth_login_info.clone();
                    if let Some(client_id) = response.client_id {
                        params.insert("client_id".to_string(), client_id);
                    }
                    params.extend(response.auth_params.unwrap_or_default());
                    return Ok(StepResult::Redirect(OAuthRedirect {
                        connector_id: connector.id.clone(),
                        params,
                        encrypt_state: response.encrypt_state,
                    }));
                }
                Ok(StepResult::Bound(response.bind_id))
            }
        }
    }
}

/// Remove a connector's binding outside the wizard.
///
/// Returns the connector as it should now appear in the catalog.
pub async fn unbind<A: PublishApi>(
    api: &A,
    connector: &Connector,
    scope: &BindScope,
) -> Result<Connector, ApiError> {
    let bind_id = connector.bind_id.clone().unwrap_or_default();
    api.unbind_connector(&bind_id, &connector.id, scope).await?;
    info!(connector_id = %connector.id, "connector unbound");
    Ok(Connector {
        bind_info: HashMap::new(),
        bind_id: None,
        config_status: ConfigStatus::NotConfigured,
        ..connector.clone()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::test_support::{MockApi, RecordingRedirector, connector};
    use studio_types::connector::ConnectorClassification;
    use studio_types::error::BindConflict;
    use studio_types::wizard::{
        AgentScope, BindConnectorResponse, CopyLinkArea, FieldDescriptor, FieldSpec, FormSchema,
        WizardSchema,
    };

    fn scope() -> BindScope {
        BindScope {
            agent_type: AgentScope::Project,
            entity_id: "p-1".to_string(),
            space_id: "s-1".to_string(),
        }
    }

    fn token_field() -> FieldDescriptor {
        FieldDescriptor::Input(FieldSpec {
            name: "token".to_string(),
            title: "Token".to_string(),
            required: true,
            rules: Vec::new(),
            options: Vec::new(),
            default: None,
        })
    }

    fn page(action: StepAction, fields: Vec<FieldDescriptor>) -> WizardPage {
        WizardPage {
            action,
            schema_area: Some(FormSchema {
                fields,
                ..Default::default()
            }),
            copy_link_area: None,
        }
    }

    fn api_with_pages(pages: Vec<WizardPage>) -> Arc<MockApi> {
        let api = MockApi::default();
        *api.schema.lock().unwrap() = Some(Ok(WizardSchema {
            title_text: "Connect".to_string(),
            pages,
            ..Default::default()
        }));
        Arc::new(api)
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lark() -> Connector {
        connector("lark", ConnectorClassification::SocialPlatform, BindType::KvBind)
    }

    async fn open(
        api: Arc<MockApi>,
        connector: Connector,
    ) -> (BindingWizard<MockApi, RecordingRedirector>, Arc<RecordingRedirector>) {
        let redirector = Arc::new(RecordingRedirector::default());
        let wizard = BindingWizard::open(api, redirector.clone(), connector, scope())
            .await
            .unwrap();
        (wizard, redirector)
    }

    #[tokio::test]
    async fn test_two_page_wizard_completes_with_bind_id() {
        let api = api_with_pages(vec![
            page(StepAction::SaveBindConfig, vec![token_field()]),
            page(StepAction::BindConnector, Vec::new()),
        ]);
        let (wizard, _) = open(api.clone(), lark()).await;
        assert_eq!(wizard.primary_action(), PrimaryAction::Next);

        let outcome = wizard.advance(values(&[("token", "xoxb-1")])).await;
        assert_eq!(outcome, AdvanceOutcome::Advanced { step: 1 });
        assert_eq!(api.calls("save_bind_config"), 1);
        assert_eq!(api.saved_details.lock().unwrap()[0]["token"], "xoxb-1");
        assert_eq!(wizard.primary_action(), PrimaryAction::Save);

        let AdvanceOutcome::Completed(outcome) = wizard.advance(HashMap::new()).await else {
            panic!("expected completion");
        };
        assert_eq!(outcome.bind_id.as_deref(), Some("bind-1"));
        assert_eq!(outcome.connector.bind_info["token"], "xoxb-1");
        assert_eq!(outcome.connector.config_status, ConfigStatus::Configured);
        assert_eq!(wizard.snapshot().phase, WizardPhase::Done);
        assert_eq!(api.calls("bind_connector"), 1);
    }

    #[tokio::test]
    async fn test_invalid_values_make_no_call() {
        let api = api_with_pages(vec![page(StepAction::SaveBindConfig, vec![token_field()])]);
        let (wizard, _) = open(api.clone(), lark()).await;

        let outcome = wizard.advance(values(&[("token", "")])).await;
        assert!(matches!(
            outcome,
            AdvanceOutcome::Failed(WizardError::InvalidField { .. })
        ));
        assert_eq!(api.calls("save_bind_config"), 0);
        assert!(wizard.snapshot().last_error.is_some());
    }

    #[tokio::test]
    async fn test_step_failure_keeps_step_and_exposes_conflict() {
        let api = api_with_pages(vec![
            page(StepAction::NotQuery, Vec::new()),
            page(StepAction::BindConnector, Vec::new()),
        ]);
        api.bind_results.lock().unwrap().push_back(Err(ApiError::Api {
            code: 700_012,
            message: "already bound".to_string(),
            conflict: Some(BindConflict {
                entity_id: Some("p-9".to_string()),
                entity_name: Some("Other project".to_string()),
                space_name: Some("Team".to_string()),
            }),
        }));
        let (wizard, _) = open(api.clone(), lark()).await;
        wizard.advance(HashMap::new()).await;

        let AdvanceOutcome::Failed(err) = wizard.advance(HashMap::new()).await else {
            panic!("expected failure");
        };
        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.step, 1);
        assert_eq!(snapshot.phase, WizardPhase::Active);
        assert_eq!(snapshot.last_error, Some(err.clone()));
        let conflict = err.api_error().and_then(ApiError::conflict).unwrap();
        assert_eq!(conflict.entity_name.as_deref(), Some("Other project"));

        // Retrying the same step succeeds.
        assert!(matches!(
            wizard.advance(HashMap::new()).await,
            AdvanceOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_oauth_response_redirects_without_advancing() {
        let api = api_with_pages(vec![page(StepAction::BindConnector, Vec::new())]);
        api.bind_results
            .lock()
            .unwrap()
            .push_back(Ok(BindConnectorResponse {
                bind_id: None,
                client_id: Some("cid-7".to_string()),
                auth_params: Some(HashMap::from([("scope".to_string(), "bot".to_string())])),
                encrypt_state: Some("state-xyz".to_string()),
            }));
        let mut slack = connector("slack", ConnectorClassification::SocialPlatform, BindType::KvAuthBind);
        slack.auth_login_info =
            HashMap::from([("redirect_uri".to_string(), "https://studio/cb".to_string())]);

        let (wizard, redirector) = open(api, slack).await;
        let AdvanceOutcome::Redirected(redirect) = wizard.advance(HashMap::new()).await else {
            panic!("expected redirect");
        };
        assert_eq!(redirect.params["client_id"], "cid-7");
        assert_eq!(redirect.params["scope"], "bot");
        assert_eq!(redirect.params["redirect_uri"], "https://studio/cb");
        assert_eq!(redirect.encrypt_state.as_deref(), Some("state-xyz"));
        assert_eq!(redirector.redirects.lock().unwrap().len(), 1);

        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.phase, WizardPhase::Redirected);
        assert_eq!(snapshot.step, 0);
    }

    #[tokio::test]
    async fn test_oauth_fields_ignored_for_plain_kv_bind() {
        let api = api_with_pages(vec![page(StepAction::BindConnector, Vec::new())]);
        api.bind_results
            .lock()
            .unwrap()
            .push_back(Ok(BindConnectorResponse {
                bind_id: Some("b-2".to_string()),
                client_id: Some("cid".to_string()),
                ..Default::default()
            }));
        let (wizard, redirector) = open(api, lark()).await;
        assert!(matches!(
            wizard.advance(HashMap::new()).await,
            AdvanceOutcome::Completed(_)
        ));
        assert!(redirector.redirects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_back_makes_no_call_and_stops_at_zero() {
        let api = api_with_pages(vec![
            page(StepAction::SaveBindConfig, Vec::new()),
            page(StepAction::SaveBindConfig, Vec::new()),
        ]);
        let (wizard, _) = open(api.clone(), lark()).await;
        assert!(!wizard.can_go_back());
        assert_eq!(wizard.back(), 0);

        wizard.advance(HashMap::new()).await;
        assert!(wizard.can_go_back());
        let calls = api.total_calls();
        assert_eq!(wizard.back(), 0);
        assert_eq!(api.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_back_hint_hidden_on_not_query_page() {
        let api = api_with_pages(vec![
            page(StepAction::SaveBindConfig, Vec::new()),
            page(StepAction::NotQuery, Vec::new()),
        ]);
        let (wizard, _) = open(api, lark()).await;
        wizard.advance(HashMap::new()).await;
        assert!(!wizard.can_go_back());
        assert_eq!(wizard.primary_action(), PrimaryAction::Complete);
    }

    #[tokio::test]
    async fn test_legacy_single_page_schema() {
        let api = MockApi::default();
        *api.schema.lock().unwrap() = Some(Ok(WizardSchema {
            schema_area: Some(FormSchema {
                fields: vec![token_field()],
                ..Default::default()
            }),
            copy_link_area: Some(CopyLinkArea {
                title_text: "Callback".to_string(),
                link_list: vec!["https://hooks.example.com/{token}".to_string()],
            }),
            ..Default::default()
        }));
        let api = Arc::new(api);
        let mut existing = lark();
        existing.bind_info = HashMap::from([("token".to_string(), "saved".to_string())]);

        let (wizard, _) = open(api.clone(), existing).await;
        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.pages.len(), 1);
        assert_eq!(snapshot.field_values["token"], "saved");
        assert_eq!(snapshot.copy_links(), vec!["https://hooks.example.com/saved"]);

        assert!(matches!(
            wizard.advance(HashMap::new()).await,
            AdvanceOutcome::Completed(_)
        ));
        assert_eq!(api.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_bind_config_merges_detail() {
        let api = api_with_pages(vec![
            page(StepAction::GetBindConfig, Vec::new()),
            page(StepAction::NotQuery, Vec::new()),
        ]);
        *api.bind_config_detail.lock().unwrap() =
            HashMap::from([("app_secret".to_string(), "normalized".to_string())]);
        let (wizard, _) = open(api, lark()).await;
        wizard.advance(values(&[("app_id", "a1")])).await;
        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.field_values["app_secret"], "normalized");
        assert_eq!(snapshot.field_values["app_id"], "a1");
    }

    #[tokio::test]
    async fn test_concurrent_advance_is_ignored() {
        let gate = Arc::new(Notify::new());
        let mut api = MockApi::default();
        api.bind_gate = Some(gate.clone());
        *api.schema.lock().unwrap() = Some(Ok(WizardSchema {
            pages: vec![page(StepAction::BindConnector, Vec::new())],
            ..Default::default()
        }));
        let api = Arc::new(api);
        let (wizard, _) = open(api.clone(), lark()).await;

        let (first, second) = tokio::join!(wizard.advance(HashMap::new()), async {
            tokio::task::yield_now().await;
            let outcome = wizard.advance(HashMap::new()).await;
            gate.notify_one();
            outcome
        });
        assert!(matches!(first, AdvanceOutcome::Completed(_)));
        assert_eq!(second, AdvanceOutcome::Ignored);
        assert_eq!(api.calls("bind_connector"), 1);
        assert!(!wizard.is_in_flight());
    }

    #[tokio::test]
    async fn test_close_during_step_discards_result() {
        let gate = Arc::new(Notify::new());
        let mut api = MockApi::default();
        api.bind_gate = Some(gate.clone());
        *api.schema.lock().unwrap() = Some(Ok(WizardSchema {
            pages: vec![page(StepAction::BindConnector, Vec::new())],
            ..Default::default()
        }));
        let (wizard, _) = open(Arc::new(api), lark()).await;

        let (outcome, ()) = tokio::join!(wizard.advance(HashMap::new()), async {
            tokio::task::yield_now().await;
            wizard.close();
            gate.notify_one();
        });
        assert_eq!(outcome, AdvanceOutcome::Discarded);
        assert_eq!(wizard.snapshot().phase, WizardPhase::Cancelled);
        assert_eq!(
            wizard.advance(HashMap::new()).await,
            AdvanceOutcome::Failed(WizardError::NotActive)
        );
    }

    #[tokio::test]
    async fn test_schema_failure_surfaces_error() {
        let api = MockApi::default();
        *api.schema.lock().unwrap() = Some(Err(ApiError::Transport("timeout".to_string())));
        let result = BindingWizard::open(
            Arc::new(api),
            Arc::new(RecordingRedirector::default()),
            lark(),
            scope(),
        )
        .await;
        assert!(matches!(result, Err(WizardError::SchemaUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unbind_resets_connector() {
        let api = MockApi::default();
        let mut bound = lark();
        bound.bind_id = Some("b-1".to_string());
        bound.bind_info = HashMap::from([("token".to_string(), "t".to_string())]);

        let updated = unbind(&api, &bound, &scope()).await.unwrap();
        assert!(updated.bind_info.is_empty());
        assert!(updated.bind_id.is_none());
        assert_eq!(updated.config_status, ConfigStatus::NotConfigured);
        assert_eq!(api.calls("unbind_connector"), 1);

        *api.unbind_result.lock().unwrap() = Some(ApiError::Transport("down".to_string()));
        assert!(unbind(&api, &bound, &scope()).await.is_err());
    }
}
