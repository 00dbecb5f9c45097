use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connector::ConnectorId;

/// An existing binding that prevents a new one (e.g. "already bound elsewhere").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindConflict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
}

/// Errors from backend calls, converted at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        conflict: Option<BindConflict>,
    },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the failure happened before the backend could answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn conflict(&self) -> Option<&BindConflict> {
        match self {
            ApiError::Api { conflict, .. } => conflict.as_ref(),
            _ => None,
        }
    }

    /// Reason string suitable for display, when the backend supplied one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ApiError::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// The field a client-side validation error points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationField {
    VersionNumber,
    VersionDescription,
    /// The connector selection as a whole.
    Connectors,
    Connector(ConnectorId),
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationField::VersionNumber => write!(f, "version_number"),
            ValidationField::VersionDescription => write!(f, "version_description"),
            ValidationField::Connectors => write!(f, "connectors"),
            ValidationField::Connector(id) => write!(f, "connector[{id}]"),
        }
    }
}

/// A client-side validation failure surfaced inline at a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: ValidationField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: ValidationField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors raised inside a binding wizard session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("wizard schema unavailable: {0}")]
    SchemaUnavailable(ApiError),

    #[error("field '{name}': {message}")]
    InvalidField { name: String, message: String },

    #[error("step failed: {0}")]
    Step(ApiError),

    #[error("wizard session is not active")]
    NotActive,
}

impl WizardError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            WizardError::SchemaUnavailable(e) | WizardError::Step(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors from publish submission. No partial record exists after any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("validation failed: {}", join_messages(.0))]
    Validation(Vec<FieldError>),

    #[error("a publish is already being submitted")]
    AlreadyPublishing,
    #[error("version {0} already exists")]
    VersionDuplicate(String),

    #[error("publish request failed: {0}")]
    Api(#[from] ApiError),
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from repository operations (draft storage).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
