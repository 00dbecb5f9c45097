//! Backend-delivered binding wizard schema.
//!
//! A connector's configuration flow is not known at compile time: the backend
//! sends an ordered list of pages, each naming the server action to run when
//! the user advances and the form fields to render. Field kinds are a tagged
//! variant over a uniform descriptor so the engine treats them as data.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Server action invoked when the user advances past a wizard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// No network call; the step succeeds immediately.
    #[default]
    NotQuery,
    /// Ask the backend to normalize/default the accumulated values.
    GetBindConfig,
    /// Persist the accumulated values for the connector.
    SaveBindConfig,
    /// Finalize the binding (may answer with an OAuth redirect).
    BindConnector,
}

/// One enumerated choice of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

/// Validation rule attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldRule {
    /// Regular expression the value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub message: String,
}

impl FieldRule {
    /// Check a value against the rule. A pattern that does not compile
    /// places no constraint on the value.
    pub fn matches(&self, value: &str) -> bool {
        if let Some(max) = self.max_length {
            if value.chars().count() > max {
                return false;
            }
        }
        match self.pattern.as_deref().map(Regex::new) {
            Some(Ok(re)) => re.is_match(value),
            Some(Err(_)) | None => true,
        }
    }
}

/// Attributes shared by every field kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<FieldRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A form field, tagged by component kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum FieldDescriptor {
    Input(FieldSpec),
    /// Several values joined with `,` in the submitted map.
    MultiInput(FieldSpec),
    Select(FieldSpec),
    MultiSelect(FieldSpec),
}

impl FieldDescriptor {
    pub fn spec(&self) -> &FieldSpec {
        match self {
            FieldDescriptor::Input(spec)
            | FieldDescriptor::MultiInput(spec)
            | FieldDescriptor::Select(spec)
            | FieldDescriptor::MultiSelect(spec) => spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec().name
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, FieldDescriptor::MultiInput(_) | FieldDescriptor::MultiSelect(_))
    }
}

/// Editable area of a wizard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormSchema {
    #[serde(default)]
    pub title_text: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

/// Static copy-link content, e.g. a callback URL the user pastes elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CopyLinkArea {
    #[serde(default)]
    pub title_text: String,
    /// Link templates with `{field}` placeholders.
    #[serde(default)]
    pub link_list: Vec<String>,
}

/// One step of a binding wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WizardPage {
    #[serde(default)]
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_area: Option<FormSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_link_area: Option<CopyLinkArea>,
}

/// Response of `GetWizardSchema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WizardSchema {
    #[serde(default)]
    pub title_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide: Option<String>,
    #[serde(default)]
    pub pages: Vec<WizardPage>,
    /// Legacy single-page schema, used when `pages` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_area: Option<FormSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_link_area: Option<CopyLinkArea>,
    /// Legacy action for the implicit page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<StepAction>,
}

impl WizardSchema {
    /// Pages to run, synthesizing one implicit page from the legacy flat
    /// fields when the backend sent none.
    pub fn effective_pages(&self) -> Vec<WizardPage> {
        if !self.pages.is_empty() {
            return self.pages.clone();
        }
        vec![WizardPage {
            action: self.action.unwrap_or_default(),
            schema_area: self.schema_area.clone(),
            copy_link_area: self.copy_link_area.clone(),
        }]
    }
}

/// Which flavour of wizard the backend should serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentScope {
    #[default]
    Project,
    Bot,
}

impl std::fmt::Display for AgentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentScope::Project => write!(f, "project"),
            AgentScope::Bot => write!(f, "bot"),
        }
    }
}

/// Identity of the entity being bound, sent with every step action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindScope {
    pub agent_type: AgentScope,
    pub entity_id: String,
    pub space_id: String,
}

/// Response of `BindConnector`.
///
/// Carries either a `bind_id` or the parameters of a second-party
/// authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BindConnectorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_params: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_state: Option<String>,
}

impl BindConnectorResponse {
    pub fn wants_redirect(&self) -> bool {
        self.client_id.as_deref().is_some_and(|c| !c.is_empty()) || self.auth_params.is_some()
    }
}

/// Parameters handed to the external redirect collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRedirect {
    pub connector_id: crate::connector::ConnectorId,
    /// `auth_login_info` merged with `client_id` and `auth_params`.
    pub params: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_pages_uses_explicit_pages() {
        let schema = WizardSchema {
            pages: vec![
                WizardPage {
                    action: StepAction::SaveBindConfig,
                    ..Default::default()
                },
                WizardPage {
                    action: StepAction::BindConnector,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let pages = schema.effective_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].action, StepAction::BindConnector);
    }

    #[test]
    fn test_effective_pages_synthesizes_legacy_page() {
        let schema = WizardSchema {
            schema_area: Some(FormSchema {
                title_text: "Credentials".to_string(),
                ..Default::default()
            }),
            action: Some(StepAction::BindConnector),
            ..Default::default()
        };
        let pages = schema.effective_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].action, StepAction::BindConnector);
        assert_eq!(pages[0].schema_area.as_ref().unwrap().title_text, "Credentials");
    }

    #[test]
    fn test_field_descriptor_tagged_deserialize() {
        let json = r#"{
            "component": "select",
            "name": "region",
            "title": "Region",
            "required": true,
            "options": [{"label": "EU", "value": "eu"}]
        }"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert!(matches!(field, FieldDescriptor::Select(_)));
        assert_eq!(field.name(), "region");
        assert!(field.spec().required);
        assert_eq!(field.spec().options.len(), 1);
    }

    #[test]
    fn test_field_rule_patterns() {
        let prefix = FieldRule {
            pattern: Some("^xoxb-".to_string()),
            ..Default::default()
        };
        assert!(prefix.matches("xoxb-123"));
        assert!(!prefix.matches("abc"));

        let exact = FieldRule {
            pattern: Some("^yes$".to_string()),
            ..Default::default()
        };
        assert!(exact.matches("yes"));
        assert!(!exact.matches("yess"));

        let max = FieldRule {
            max_length: Some(3),
            ..Default::default()
        };
        assert!(max.matches("abc"));
        assert!(!max.matches("abcd"));

        let digits = FieldRule {
            pattern: Some(r"^\d{6,}$".to_string()),
            ..Default::default()
        };
        assert!(digits.matches("1234567"));
        assert!(!digits.matches("12a456"));

        let broken = FieldRule {
            pattern: Some("(unclosed".to_string()),
            ..Default::default()
        };
        assert!(broken.matches("anything"));
    }

    #[test]
    fn test_bind_response_redirect_detection() {
        let plain = BindConnectorResponse {
            bind_id: Some("b-1".to_string()),
            ..Default::default()
        };
        assert!(!plain.wants_redirect());

        let oauth = BindConnectorResponse {
            client_id: Some("cid".to_string()),
            ..Default::default()
        };
        assert!(oauth.wants_redirect());
    }
}
