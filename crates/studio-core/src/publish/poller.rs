//! Publish record polling.
//!
//! `PublishPoller` owns the only repeating timer of the engine. It reads the
//! tracked record on a fixed interval, one request at a time, publishes
//! every record it sees on a `watch` channel and stops on its own once the
//! record can no longer change. Polling pauses while the consuming view is
//! hidden and ends when the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use studio_types::config::StudioConfig;
use studio_types::error::ApiError;
use studio_types::publish::{
    ConnectorPublishStatus, PublishRecord, PublishRecordStatus, RecordLookup,
};

use crate::api::PublishApi;

/// `tokio::time::interval` rejects a zero period.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Why polling ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStop {
    /// Packaging or audit failed for the whole project.
    ProjectFailed(PublishRecordStatus),
    /// Every connector reached a state that no further poll will change.
    ConnectorsSettled,
    /// Too many consecutive request failures; the last record stands.
    TooManyErrors(ApiError),
    /// The consumer went away.
    Cancelled,
}

impl PollStop {
    /// Whether the tracked record has reached its final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollStop::ProjectFailed(_) | PollStop::ConnectorsSettled)
    }
}

/// Final report of a polling run.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub stop: PollStop,
    pub last_record: Option<PublishRecord>,
    pub requests: u32,
}

/// Decide whether a record ends polling.
///
/// A connector parked in `Auditing` waits on an external review; it counts
/// as settled once the project has left `ConnectorPublishing`. A `Disable`d
/// connector will not change either.
pub fn stop_reason(record: &PublishRecord) -> Option<PollStop> {
    if record.publish_status.is_failure() {
        return Some(PollStop::ProjectFailed(record.publish_status));
    }
    let results = &record.connector_publish_result;
    if results.is_empty() {
        return (record.publish_status == PublishRecordStatus::PublishDone)
            .then_some(PollStop::ConnectorsSettled);
    }
    let still_delivering = record.publish_status <= PublishRecordStatus::ConnectorPublishing;
    let settled = results.iter().all(|r| match r.connector_publish_status {
        ConnectorPublishStatus::Default => false,
        ConnectorPublishStatus::Auditing => !still_delivering,
        ConnectorPublishStatus::Failed
        | ConnectorPublishStatus::Success
        | ConnectorPublishStatus::Disable => true,
    });
    settled.then_some(PollStop::ConnectorsSettled)
}

/// Polls one publish record until it settles.
pub struct PublishPoller<A> {
    api: Arc<A>,
    project_id: String,
    lookup: RecordLookup,
    interval: Duration,
    max_consecutive_errors: u32,
}

impl<A: PublishApi + 'static> PublishPoller<A> {
    /// Poller for a freshly submitted record, at the submission cadence.
    pub fn for_record(
        api: Arc<A>,
        project_id: impl Into<String>,
        publish_record_id: impl Into<String>,
        config: &StudioConfig,
    ) -> Self {
        Self {
            api,
            project_id: project_id.into(),
            lookup: RecordLookup::ById(publish_record_id.into()),
            interval: config.poll_interval().max(MIN_TICK),
            max_consecutive_errors: config.max_consecutive_poll_errors.max(1),
        }
    }

    /// Poller for the project's latest record, at the slower status cadence.
    pub fn for_latest(api: Arc<A>, project_id: impl Into<String>, config: &StudioConfig) -> Self {
        Self {
            api,
            project_id: project_id.into(),
            lookup: RecordLookup::Latest,
            interval: config.latest_status_interval().max(MIN_TICK),
            max_consecutive_errors: config.max_consecutive_poll_errors.max(1),
        }
    }

    /// Run until a stop condition is met.
    ///
    /// The first read happens immediately. While `visible` is false no
    /// requests are made; becoming visible again triggers a read right away.
    pub async fn run(
        self,
        records: watch::Sender<Option<PublishRecord>>,
        mut visible: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) -> PollOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last_record: Option<PublishRecord> = None;
        let mut requests = 0u32;
        let mut consecutive_errors = 0u32;

        let finish = |stop: PollStop, last_record: Option<PublishRecord>, requests: u32| {
            info!(stop = ?stop, requests, "publish polling stopped");
            PollOutcome {
                stop,
                last_record,
                requests,
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return finish(PollStop::Cancelled, last_record, requests),
                _ = ticker.tick() => {}
            }

            if !*visible.borrow_and_update() {
                debug!(project_id = %self.project_id, "view hidden, pausing publish polling");
                tokio::select! {
                    _ = cancel.cancelled() => return finish(PollStop::Cancelled, last_record, requests),
                    shown = async { visible.wait_for(|v| *v).await.is_ok() } => {
                        if !shown {
                            return finish(PollStop::Cancelled, last_record, requests);
                        }
                    }
                }
                ticker.reset();
            }

            requests += 1;
            let fetched = tokio::select! {
                _ = cancel.cancelled() => return finish(PollStop::Cancelled, last_record, requests),
                fetched = self.api.get_publish_record_detail(&self.project_id, &self.lookup) => fetched,
            };

            match fetched {
                Ok(Some(record)) => {
                    consecutive_errors = 0;
                    let stop = stop_reason(&record);
                    debug!(
                        publish_record_id = %record.publish_record_id,
                        status = %record.publish_status,
                        "publish record polled"
                    );
                    records.send_replace(Some(record.clone()));
                    last_record = Some(record);
                    if let Some(stop) = stop {
                        return finish(stop, last_record, requests);
                    }
                }
                Ok(None) => {
                    consecutive_errors = 0;
                    debug!(project_id = %self.project_id, "publish record not available yet");
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        project_id = %self.project_id,
                        attempt = consecutive_errors,
                        transport = e.is_transport(),
                        error = %e,
                        "publish record poll failed"
                    );
                    if consecutive_errors >= self.max_consecutive_errors {
                        return finish(PollStop::TooManyErrors(e), last_record, requests);
                    }
                }
            }
        }
    }

    /// Run on a background task.
    pub fn spawn(self, visible: watch::Receiver<bool>, cancel: CancellationToken) -> PollHandle {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(self.run(tx, visible, cancel.clone()));
        PollHandle {
            records: rx,
            cancel,
            task,
        }
    }
}

/// A poller running on its own task. Dropping the handle cancels it.
pub struct PollHandle {
    pub records: watch::Receiver<Option<PublishRecord>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the poller to stop.
    pub async fn join(mut self) -> Option<PollOutcome> {
        (&mut self.task).await.ok()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Read one historical record. Never polled.
pub async fn fetch_historical<A: PublishApi>(
    api: &A,
    project_id: &str,
    publish_record_id: &str,
) -> Result<Option<PublishRecord>, ApiError> {
    api.get_publish_record_detail(project_id, &RecordLookup::ById(publish_record_id.to_string()))
        .await
}
