//! Backend port traits.
//!
//! `PublishApi` is the RPC surface the engine consumes; the HTTP
//! implementation lives in `studio-infra`. `AuthRedirector` is the external
//! collaborator that performs the second-party authorization hop.
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use std::collections::HashMap;
use std::future::Future;

use studio_types::connector::{ConnectorId, ConnectorListing};
use studio_types::error::ApiError;
use studio_types::publish::{
    PublishRecord, PublishRecordSummary, PublishRequest, PublishResponse, RecordLookup,
};
use studio_types::wizard::{
    AgentScope, BindConnectorResponse, BindScope, OAuthRedirect, WizardSchema,
};

/// Backend RPC surface of the publish subsystem.
pub trait PublishApi: Send + Sync {
    /// Catalog seed: connectors, union metadata and last publish hints.
    fn list_connectors(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<ConnectorListing, ApiError>> + Send;

    /// Wizard definition for one connector.
    fn get_wizard_schema(
        &self,
        connector_id: &ConnectorId,
        scope: AgentScope,
    ) -> impl Future<Output = Result<WizardSchema, ApiError>> + Send;

    /// Step action: returns the (possibly normalized) config detail.
    fn get_bind_config(
        &self,
        connector_id: &ConnectorId,
        detail: &HashMap<String, String>,
        scope: &BindScope,
    ) -> impl Future<Output = Result<HashMap<String, String>, ApiError>> + Send;

    /// Step action: persist the current values for the connector.
    fn save_bind_config(
        &self,
        connector_id: &ConnectorId,
        detail: &HashMap<String, String>,
        scope: &BindScope,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Step action: finalize the binding.
    fn bind_connector(
        &self,
        connector_id: &ConnectorId,
        connector_info: &HashMap<String, String>,
        scope: &BindScope,
    ) -> impl Future<Output = Result<BindConnectorResponse, ApiError>> + Send;

    /// Explicit unbind, outside the wizard.
    fn unbind_connector(
        &self,
        bind_id: &str,
        connector_id: &ConnectorId,
        scope: &BindScope,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Submit a publish.
    fn publish_project(
        &self,
        request: &PublishRequest,
    ) -> impl Future<Output = Result<PublishResponse, ApiError>> + Send;

    /// Read one publish record. `None` when the backend has no such record.
    fn get_publish_record_detail(
        &self,
        project_id: &str,
        lookup: &RecordLookup,
    ) -> impl Future<Output = Result<Option<PublishRecord>, ApiError>> + Send;

    /// History selector entries, newest first.
    fn list_publish_records(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<PublishRecordSummary>, ApiError>> + Send;

    /// Whether `version_number` already exists for the project.
    fn check_version_number(
        &self,
        project_id: &str,
        version_number: &str,
    ) -> impl Future<Output = Result<bool, ApiError>> + Send;
}

/// Hands control to an external authorization page.
///
/// The redirect is a terminal outcome: the user comes back through a
/// different entry point that re-reads the binding state from the backend.
pub trait AuthRedirector: Send + Sync {
    fn redirect(&self, redirect: &OAuthRedirect);
}
