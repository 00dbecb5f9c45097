//! Classification of a publish record for display.
//!
//! `aggregate` reduces a record to one batch status; `progress` derives the
//! three step indicators (packaging, audit, connector delivery).

use studio_types::publish::{
    AggregateStatus, ConnectorPublishStatus, PublishRecord, PublishRecordStatus,
};

/// Batch status of a record.
///
/// Failure is sticky: one failed connector marks the whole batch failed even
/// when others succeeded.
pub fn aggregate(record: &PublishRecord) -> AggregateStatus {
    if record.publish_status.is_failure() {
        return AggregateStatus::Failed;
    }
    let results = &record.connector_publish_result;
    if results
        .iter()
        .any(|r| r.connector_publish_status == ConnectorPublishStatus::Failed)
    {
        return AggregateStatus::Failed;
    }
    if record.publish_status < PublishRecordStatus::ConnectorPublishing {
        return AggregateStatus::Publishing;
    }
    if results.is_empty() {
        return match record.publish_status {
            PublishRecordStatus::PublishDone => AggregateStatus::Success,
            _ => AggregateStatus::Publishing,
        };
    }
    if results
        .iter()
        .any(|r| r.connector_publish_status.is_in_flight())
    {
        return AggregateStatus::Publishing;
    }
    AggregateStatus::Success
}

/// State of one progress step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Wait,
    Process,
    Finish,
    Error,
    /// Some, but not all, connectors failed.
    Warn,
}

/// Step indicators of a publish record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishProgress {
    pub pack: StepState,
    pub audit: StepState,
    pub connectors: StepState,
}

pub fn progress(record: &PublishRecord) -> PublishProgress {
    use PublishRecordStatus::*;

    let pack = match record.publish_status {
        Packing => StepState::Process,
        PackFailed => StepState::Error,
        _ => StepState::Finish,
    };
    let audit = match record.publish_status {
        Packing | PackFailed => StepState::Wait,
        Auditing => StepState::Process,
        AuditNotPass => StepState::Error,
        _ => StepState::Finish,
    };
    let connectors = connector_step(record);

    PublishProgress {
        pack,
        audit,
        connectors,
    }
}

fn connector_step(record: &PublishRecord) -> StepState {
    let results = &record.connector_publish_result;
    if record.publish_status < PublishRecordStatus::ConnectorPublishing || results.is_empty() {
        return StepState::Wait;
    }
    let failed = results
        .iter()
        .filter(|r| r.connector_publish_status == ConnectorPublishStatus::Failed)
        .count();
    if failed == results.len() {
        return StepState::Error;
    }
    if failed > 0 {
        return StepState::Warn;
    }
    if results
        .iter()
        .any(|r| r.connector_publish_status.is_in_flight())
    {
        return StepState::Process;
    }
    StepState::Finish
}
