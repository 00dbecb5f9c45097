//! Publish submission.
//!
//! `PublishController` validates the session, assembles the request,
//! submits it and then tracks the resulting record through a
//! `PublishPoller`. A single flag guards against double submission.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use studio_types::config::StudioConfig;
use studio_types::connector::ConnectorClassification;
use studio_types::error::{ApiError, SubmitError};
use studio_types::publish::{
    AggregateStatus, PublishRecord, PublishRecordSummary, PublishRequest, PublishResponse,
};

use crate::api::PublishApi;
use crate::readiness;
use crate::session::PublishSession;

use super::aggregate::aggregate;
use super::poller::{PollOutcome, PublishPoller};
use super::validate::validate;

/// Where the controller is in the submit/track cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Submitting,
    Polling { publish_record_id: String },
    Finished {
        publish_record_id: String,
        status: AggregateStatus,
    },
}

/// Assemble the request body from the session.
///
/// Only selected connectors that are ready are included. Social platform
/// connectors carry the shared social chat-flow; store connectors send their
/// listing configuration as bind info.
pub fn build_request(session: &PublishSession) -> PublishRequest {
    let mut connectors = HashMap::new();
    let mut connector_publish_config = HashMap::new();

    for connector in session.selected_connectors() {
        if !readiness::evaluate(connector, session).is_ready() {
            continue;
        }
        let bind_info = match session.store_configs.get(&connector.id) {
            Some(store) if connector.is_store() => store.clone(),
            _ => connector.bind_info.clone(),
        };
        connectors.insert(connector.id.clone(), bind_info);

        let config = if connector.classification == ConnectorClassification::SocialPlatform {
            session.social_platform_chatflow.clone()
        } else {
            session.connector_publish_config.get(&connector.id).cloned()
        };
        if let Some(config) = config {
            connector_publish_config.insert(connector.id.clone(), config);
        }
    }

    PublishRequest {
        project_id: session.project_id.clone(),
        version_number: session.version_number.trim().to_string(),
        description: session.version_description.clone(),
        connectors,
        connector_publish_config,
    }
}

/// Resets the submission flag however `submit` returns.
struct Publishing<'a>(&'a AtomicBool);

impl Drop for Publishing<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives validation, submission and tracking of one project's publishes.
pub struct PublishController<A> {
    api: Arc<A>,
    config: StudioConfig,
    publishing: AtomicBool,
    phase: Mutex<ControllerPhase>,
}

impl<A: PublishApi + 'static> PublishController<A> {
    pub fn new(api: Arc<A>, config: StudioConfig) -> Self {
        Self {
            api,
            config,
            publishing: AtomicBool::new(false),
            phase: Mutex::new(ControllerPhase::Idle),
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
            .lock()
            .expect("controller phase lock poisoned")
            .clone()
    }

    fn set_phase(&self, phase: ControllerPhase) {
        *self.phase.lock().expect("controller phase lock poisoned") = phase;
    }

    /// Publish history used for the uniqueness check and the record selector.
    pub async fn load_history(
        &self,
        project_id: &str,
    ) -> Result<Vec<PublishRecordSummary>, ApiError> {
        self.api.list_publish_records(project_id).await
    }

    /// Validate and submit the session.
    ///
    /// Validation failures send nothing and leave the controller `Idle`, as
    /// does any failed request. On success the controller is `Polling` the
    /// returned record.
    pub async fn submit(
        &self,
        session: &PublishSession,
        history: &[PublishRecordSummary],
    ) -> Result<PublishResponse, SubmitError> {
        if self.publishing.swap(true, Ordering::AcqRel) {
            return Err(SubmitError::AlreadyPublishing);
        }
        let _publishing = Publishing(&self.publishing);

        let errors = validate(session, history, &self.config);
        if !errors.is_empty() {
            info!(
                project_id = %session.project_id,
                errors = errors.len(),
                "publish blocked by validation"
            );
            return Err(SubmitError::Validation(errors));
        }

        self.set_phase(ControllerPhase::Submitting);
        let result = self.send(session).await;
        match &result {
            Ok(response) => {
                info!(
                    project_id = %session.project_id,
                    publish_record_id = %response.publish_record_id,
                    "publish submitted"
                );
                self.set_phase(ControllerPhase::Polling {
                    publish_record_id: response.publish_record_id.clone(),
                });
            }
            Err(e) => {
                warn!(project_id = %session.project_id, error = %e, "publish submission failed");
                self.set_phase(ControllerPhase::Idle);
            }
        }
        result
    }

    async fn send(&self, session: &PublishSession) -> Result<PublishResponse, SubmitError> {
        let request = build_request(session);
        let duplicate = self
            .api
            .check_version_number(&request.project_id, &request.version_number)
            .await?;
        if duplicate {
            return Err(SubmitError::VersionDuplicate(request.version_number));
        }
        Ok(self.api.publish_project(&request).await?)
    }

    /// Poll the submitted record until it settles.
    ///
    /// Records are published on `records`. When the record reaches its final
    /// state the controller is `Finished`; if polling gives up or is
    /// cancelled the phase stays `Polling` with the last status frozen.
    pub async fn track(
        &self,
        project_id: &str,
        publish_record_id: &str,
        records: watch::Sender<Option<PublishRecord>>,
        visible: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) -> PollOutcome {
        self.set_phase(ControllerPhase::Polling {
            publish_record_id: publish_record_id.to_string(),
        });
        let poller = PublishPoller::for_record(
            self.api.clone(),
            project_id,
            publish_record_id,
            &self.config,
        );
        let outcome = poller.run(records, visible, cancel).await;
        if outcome.stop.is_terminal() {
            if let Some(record) = &outcome.last_record {
                self.set_phase(ControllerPhase::Finished {
                    publish_record_id: publish_record_id.to_string(),
                    status: aggregate(record),
                });
            }
        }
        outcome
    }
}
