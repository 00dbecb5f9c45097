//! `PublishApi` over HTTP/JSON.
//!
//! Every call is a `POST` of a JSON body to `{api_base_url}/{path}`; the
//! response is the shared envelope decoded by [`super::envelope::decode`].

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use studio_core::api::PublishApi;
use studio_types::config::StudioConfig;
use studio_types::connector::{ConnectorId, ConnectorListing};
use studio_types::error::ApiError;
use studio_types::publish::{
    PublishRecord, PublishRecordSummary, PublishRequest, PublishResponse, RecordLookup,
};
use studio_types::wizard::{AgentScope, BindConnectorResponse, BindScope, WizardSchema};

use super::envelope;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

const LIST_CONNECTORS: &str = "publish/connector_list";
const WIZARD_SCHEMA: &str = "publish/connector_wizard";
const GET_BIND_CONFIG: &str = "publish/get_bind_config";
const SAVE_BIND_CONFIG: &str = "publish/save_bind_config";
const BIND_CONNECTOR: &str = "publish/bind_connector";
const UNBIND_CONNECTOR: &str = "publish/unbind_connector";
const PUBLISH_PROJECT: &str = "publish/publish_project";
const RECORD_DETAIL: &str = "publish/record_detail";
const RECORD_LIST: &str = "publish/record_list";
const CHECK_VERSION: &str = "publish/check_version_number";

#[derive(Debug, Deserialize)]
struct BindConfigData {
    #[serde(default)]
    config_detail: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CheckVersionData {
    #[serde(default)]
    is_duplicate: bool,
}

/// Backend client for the publish subsystem.
#[derive(Clone)]
pub struct HttpPublishApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpPublishApi {
    /// Build a client for `config.api_base_url` with the configured timeout.
    pub fn new(config: &StudioConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("studio-infra/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self::with_client(&config.api_base_url, http))
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "backend request");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "backend request failed");
                ApiError::Transport(e.to_string())
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to read response body: {e}")))?;

        let result = envelope::decode(status, &bytes);
        if let Err(ref e) = result {
            warn!(%url, status = status.as_u16(), error = %e, "backend call rejected");
        }
        result
    }
}

fn scoped(scope: &BindScope, connector_id: &ConnectorId) -> serde_json::Map<String, serde_json::Value> {
    let mut body = serde_json::Map::new();
    body.insert("connector_id".to_string(), json!(connector_id));
    body.insert("agent_type".to_string(), json!(scope.agent_type));
    body.insert("entity_id".to_string(), json!(scope.entity_id));
    body.insert("space_id".to_string(), json!(scope.space_id));
    body
}

impl PublishApi for HttpPublishApi {
    async fn list_connectors(&self, project_id: &str) -> Result<ConnectorListing, ApiError> {
        self.call(LIST_CONNECTORS, &json!({ "project_id": project_id }))
            .await
    }

    async fn get_wizard_schema(
        &self,
        connector_id: &ConnectorId,
        scope: AgentScope,
    ) -> Result<WizardSchema, ApiError> {
        self.call(
            WIZARD_SCHEMA,
            &json!({ "connector_id": connector_id, "agent_type": scope }),
        )
        .await
    }

    async fn get_bind_config(
        &self,
        connector_id: &ConnectorId,
        detail: &HashMap<String, String>,
        scope: &BindScope,
    ) -> Result<HashMap<String, String>, ApiError> {
        let mut body = scoped(scope, connector_id);
        body.insert("detail".to_string(), json!(detail));
        let data: Option<BindConfigData> = self.call(GET_BIND_CONFIG, &body).await?;
        Ok(data.map(|d| d.config_detail).unwrap_or_default())
    }

    async fn save_bind_config(
        &self,
        connector_id: &ConnectorId,
        detail: &HashMap<String, String>,
        scope: &BindScope,
    ) -> Result<(), ApiError> {
        let mut body = scoped(scope, connector_id);
        body.insert("detail".to_string(), json!(detail));
        self.call(SAVE_BIND_CONFIG, &body).await
    }

    async fn bind_connector(
        &self,
        connector_id: &ConnectorId,
        connector_info: &HashMap<String, String>,
        scope: &BindScope,
    ) -> Result<BindConnectorResponse, ApiError> {
        let mut body = scoped(scope, connector_id);
        body.insert("connector_info".to_string(), json!(connector_info));
        self.call(BIND_CONNECTOR, &body).await
    }

    async fn unbind_connector(
        &self,
        bind_id: &str,
        connector_id: &ConnectorId,
        scope: &BindScope,
    ) -> Result<(), ApiError> {
        let mut body = scoped(scope, connector_id);
        body.insert("bind_id".to_string(), json!(bind_id));
        self.call(UNBIND_CONNECTOR, &body).await
    }

    async fn publish_project(&self, request: &PublishRequest) -> Result<PublishResponse, ApiError> {
        self.call(PUBLISH_PROJECT, request).await
    }

    async fn get_publish_record_detail(
        &self,
        project_id: &str,
        lookup: &RecordLookup,
    ) -> Result<Option<PublishRecord>, ApiError> {
        let body = match lookup {
            RecordLookup::ById(id) => json!({ "project_id": project_id, "publish_record_id": id }),
            RecordLookup::Latest => json!({ "project_id": project_id }),
        };
        self.call(RECORD_DETAIL, &body).await
    }

    async fn list_publish_records(
        &self,
        project_id: &str,
    ) -> Result<Vec<PublishRecordSummary>, ApiError> {
        let records: Option<Vec<PublishRecordSummary>> = self
            .call(RECORD_LIST, &json!({ "project_id": project_id }))
            .await?;
        Ok(records.unwrap_or_default())
    }

    async fn check_version_number(
        &self,
        project_id: &str,
        version_number: &str,
    ) -> Result<bool, ApiError> {
        let data: Option<CheckVersionData> = self
            .call(
                CHECK_VERSION,
                &json!({ "project_id": project_id, "version_number": version_number }),
            )
            .await?;
        Ok(data.is_some_and(|d| d.is_duplicate))
    }
}
