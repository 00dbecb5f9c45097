//! Client-side checks run before any publish request is sent.

use studio_types::config::StudioConfig;
use studio_types::error::{FieldError, ValidationField};
use studio_types::publish::PublishRecordSummary;
use studio_types::version::VersionNumber;

use crate::readiness::{self, Readiness};
use crate::session::PublishSession;

/// Validate the session for submission. An empty result means it may be sent.
///
/// `history` holds the project's previous publish records; a version number
/// already used by one of them is rejected.
pub fn validate(
    session: &PublishSession,
    history: &[PublishRecordSummary],
    config: &StudioConfig,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let version = session.version_number.trim();
    if version.is_empty() {
        errors.push(FieldError::new(
            ValidationField::VersionNumber,
            "version number is required",
        ));
    } else {
        match version.parse::<VersionNumber>() {
            Ok(parsed) => {
                if history.iter().any(|r| parsed.same_as(&r.version_number)) {
                    errors.push(FieldError::new(
                        ValidationField::VersionNumber,
                        format!("version {parsed} has already been published"),
                    ));
                }
            }
            Err(e) => errors.push(FieldError::new(ValidationField::VersionNumber, e)),
        }
    }

    if session.version_description.chars().count() > config.description_max_len {
        errors.push(FieldError::new(
            ValidationField::VersionDescription,
            format!(
                "description must be at most {} characters",
                config.description_max_len
            ),
        ));
    }

    if session.selected_connector_ids.is_empty() {
        errors.push(FieldError::new(
            ValidationField::Connectors,
            "select at least one connector",
        ));
    }

    for id in &session.selected_connector_ids {
        let field = ValidationField::Connector(id.clone());
        let Some(connector) = session.connector(id) else {
            errors.push(FieldError::new(field, "connector is no longer available"));
            continue;
        };
        if let Readiness::Disabled(reason) = readiness::evaluate(connector, session) {
            errors.push(FieldError::new(
                field,
                format!("{}: {}", connector.name, reason.message()),
            ));
        }
    }

    errors
}
