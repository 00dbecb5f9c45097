//! Shared fixtures for unit tests: connector builders and a scripted
//! in-memory `PublishApi`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use studio_types::connector::{
    BindType, ConfigStatus, Connector, ConnectorClassification, ConnectorId, ConnectorListing,
};
use studio_types::error::ApiError;
use studio_types::publish::{
    ConnectorPublishResult, ConnectorPublishStatus, PublishRecord, PublishRecordStatus,
    PublishRecordSummary, PublishRequest, PublishResponse, RecordLookup,
};
use studio_types::wizard::{
    AgentScope, BindConnectorResponse, BindScope, OAuthRedirect, WizardSchema,
};

use crate::api::{AuthRedirector, PublishApi};
use crate::session::PublishSession;

pub(crate) fn connector(id: &str, class: ConnectorClassification, bind: BindType) -> Connector {
    Connector {
        id: ConnectorId::from(id),
        name: format!("connector {id}"),
        description: String::new(),
        icon_url: String::new(),
        bind_type: bind,
        classification: class,
        config_status: ConfigStatus::Configured,
        union_id: None,
        allow_publish: true,
        not_allow_publish_reason: None,
        bind_id: None,
        bind_info: HashMap::new(),
        auth_login_info: HashMap::new(),
        description_extra: None,
    }
}

/// A session with the given catalog installed and no previous publish.
pub(crate) fn loaded_session(connectors: Vec<Connector>) -> PublishSession {
    PublishSession::new("p-1").with_catalog(ConnectorListing {
        connector_list: connectors,
        ..Default::default()
    })
}

/// A record whose connector results carry the given statuses.
pub(crate) fn record(
    status: PublishRecordStatus,
    results: &[(&str, ConnectorPublishStatus)],
) -> PublishRecord {
    PublishRecord {
        publish_record_id: "record-1".to_string(),
        version_number: "v1.0.0".to_string(),
        publish_status: status,
        publish_status_detail: None,
        connector_publish_result: results
            .iter()
            .map(|(id, s)| ConnectorPublishResult {
                connector_id: ConnectorId::from(*id),
                connector_name: id.to_string(),
                connector_icon_url: String::new(),
                connector_publish_status: *s,
                status_message: None,
                share_link: None,
                download_link: None,
                connector_bind_info: HashMap::new(),
                connector_publish_config: None,
            })
            .collect(),
        publish_monetization_result: None,
    }
}

/// Scripted backend. Each queue is consumed front to back; publish records
/// repeat the last scripted entry once the queue runs dry.
#[derive(Default)]
pub(crate) struct MockApi {
    pub listing: Mutex<ConnectorListing>,
    pub schema: Mutex<Option<Result<WizardSchema, ApiError>>>,
    pub bind_config_detail: Mutex<HashMap<String, String>>,
    pub save_results: Mutex<VecDeque<Result<(), ApiError>>>,
    pub bind_results: Mutex<VecDeque<Result<BindConnectorResponse, ApiError>>>,
    pub unbind_result: Mutex<Option<ApiError>>,
    pub publish_result: Mutex<Option<Result<PublishResponse, ApiError>>>,
    pub records: Mutex<VecDeque<Result<Option<PublishRecord>, ApiError>>>,
    pub last_record: Mutex<Option<Result<Option<PublishRecord>, ApiError>>>,
    pub history: Mutex<Vec<PublishRecordSummary>>,
    pub duplicate_versions: Mutex<Vec<String>>,
    /// When set, `bind_connector` waits for a notification before answering.
    pub bind_gate: Option<Arc<Notify>>,
    /// When set, `publish_project` waits for a notification before answering.
    pub publish_gate: Option<Arc<Notify>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub published: Mutex<Vec<PublishRequest>>,
    pub saved_details: Mutex<Vec<HashMap<String, String>>>,
}

impl MockApi {
    pub(crate) fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == name)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn push_record(&self, record: Result<Option<PublishRecord>, ApiError>) {
        self.records.lock().unwrap().push_back(record);
    }

    fn record_call(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

impl PublishApi for MockApi {
    async fn list_connectors(&self, _project_id: &str) -> Result<ConnectorListing, ApiError> {
        self.record_call("list_connectors");
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn get_wizard_schema(
        &self,
        _connector_id: &ConnectorId,
        _scope: AgentScope,
    ) -> Result<WizardSchema, ApiError> {
        self.record_call("get_wizard_schema");
        self.schema
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(WizardSchema::default()))
    }

    async fn get_bind_config(
        &self,
        _connector_id: &ConnectorId,
        _detail: &HashMap<String, String>,
        _scope: &BindScope,
    ) -> Result<HashMap<String, String>, ApiError> {
        self.record_call("get_bind_config");
        Ok(self.bind_config_detail.lock().unwrap().clone())
    }

    async fn save_bind_config(
        &self,
        _connector_id: &ConnectorId,
        detail: &HashMap<String, String>,
        _scope: &BindScope,
    ) -> Result<(), ApiError> {
        self.record_call("save_bind_config");
        self.saved_details.lock().unwrap().push(detail.clone());
        self.save_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn bind_connector(
        &self,
        _connector_id: &ConnectorId,
        _connector_info: &HashMap<String, String>,
        _scope: &BindScope,
    ) -> Result<BindConnectorResponse, ApiError> {
        self.record_call("bind_connector");
        if let Some(gate) = &self.bind_gate {
            gate.notified().await;
        }
        self.bind_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(BindConnectorResponse {
                    bind_id: Some("bind-1".to_string()),
                    ..Default::default()
                })
            })
    }

    async fn unbind_connector(
        &self,
        _bind_id: &str,
        _connector_id: &ConnectorId,
        _scope: &BindScope,
    ) -> Result<(), ApiError> {
        self.record_call("unbind_connector");
        match self.unbind_result.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn publish_project(&self, request: &PublishRequest) -> Result<PublishResponse, ApiError> {
        self.record_call("publish_project");
        if let Some(gate) = &self.publish_gate {
            gate.notified().await;
        }
        self.published.lock().unwrap().push(request.clone());
        self.publish_result.lock().unwrap().clone().unwrap_or_else(|| {
            Ok(PublishResponse {
                publish_record_id: "record-1".to_string(),
                publish_monetization_result: Some(true),
            })
        })
    }

    async fn get_publish_record_detail(
        &self,
        _project_id: &str,
        _lookup: &RecordLookup,
    ) -> Result<Option<PublishRecord>, ApiError> {
        self.record_call("get_publish_record_detail");
        let next = self.records.lock().unwrap().pop_front();
        let mut last = self.last_record.lock().unwrap();
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last.clone().unwrap_or(Ok(None)),
        }
    }

    async fn list_publish_records(
        &self,
        _project_id: &str,
    ) -> Result<Vec<PublishRecordSummary>, ApiError> {
        self.record_call("list_publish_records");
        Ok(self.history.lock().unwrap().clone())
    }

    async fn check_version_number(
        &self,
        _project_id: &str,
        version_number: &str,
    ) -> Result<bool, ApiError> {
        self.record_call("check_version_number");
        Ok(self
            .duplicate_versions
            .lock()
            .unwrap()
            .iter()
            .any(|v| v == version_number))
    }
}

/// Records every redirect it is asked to perform.
#[derive(Default)]
pub(crate) struct RecordingRedirector {
    pub redirects: Mutex<Vec<OAuthRedirect>>,
}

impl AuthRedirector for RecordingRedirector {
    fn redirect(&self, redirect: &OAuthRedirect) {
        self.redirects.lock().unwrap().push(redirect.clone());
    }
}
