use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a publish target, as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub String);

impl ConnectorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Connector id of the built-in template publish target.
pub const TEMPLATE_CONNECTOR_ID: &str = "999999";

/// Connector id of the chat widget Web SDK target.
pub const WEB_SDK_CONNECTOR_ID: &str = "999";

/// How a connector must be bound before it can receive a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindType {
    NoBindRequired,
    /// Emitted by the backend for the API target; behaves like `NoBindRequired`.
    ApiBind,
    KvBind,
    AuthBind,
    KvAuthBind,
    WebSdkBind,
    StoreBind,
    TemplateBind,
}

impl BindType {
    /// Bind types that block publishing until a binding exists.
    pub fn requires_binding(self) -> bool {
        matches!(
            self,
            BindType::KvBind | BindType::AuthBind | BindType::KvAuthBind | BindType::TemplateBind
        )
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BindType::NoBindRequired => "no_bind_required",
            BindType::ApiBind => "api_bind",
            BindType::KvBind => "kv_bind",
            BindType::AuthBind => "auth_bind",
            BindType::KvAuthBind => "kv_auth_bind",
            BindType::WebSdkBind => "web_sdk_bind",
            BindType::StoreBind => "store_bind",
            BindType::TemplateBind => "template_bind",
        };
        f.write_str(s)
    }
}

/// Display grouping of connectors. Declaration order is the catalog's group order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorClassification {
    ApiOrSdk,
    MiniProgram,
    SocialPlatform,
    FirstPartyStore,
    ExtensionLibrary,
}

impl ConnectorClassification {
    pub const ORDER: [ConnectorClassification; 5] = [
        ConnectorClassification::ApiOrSdk,
        ConnectorClassification::MiniProgram,
        ConnectorClassification::SocialPlatform,
        ConnectorClassification::FirstPartyStore,
        ConnectorClassification::ExtensionLibrary,
    ];
}

impl fmt::Display for ConnectorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorClassification::ApiOrSdk => "api_or_sdk",
            ConnectorClassification::MiniProgram => "mini_program",
            ConnectorClassification::SocialPlatform => "social_platform",
            ConnectorClassification::FirstPartyStore => "first_party_store",
            ConnectorClassification::ExtensionLibrary => "extension_library",
        };
        f.write_str(s)
    }
}

impl FromStr for ConnectorClassification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api_or_sdk" => Ok(ConnectorClassification::ApiOrSdk),
            "mini_program" => Ok(ConnectorClassification::MiniProgram),
            "social_platform" => Ok(ConnectorClassification::SocialPlatform),
            "first_party_store" => Ok(ConnectorClassification::FirstPartyStore),
            "extension_library" => Ok(ConnectorClassification::ExtensionLibrary),
            other => Err(format!("invalid connector classification: '{other}'")),
        }
    }
}

/// Binding/configuration state of a connector as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    #[default]
    NotConfigured,
    Configuring,
    Configured,
    Disconnected,
    NeedReconfiguring,
}

/// A publish target descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_url: String,
    pub bind_type: BindType,
    pub classification: ConnectorClassification,
    #[serde(default)]
    pub config_status: ConfigStatus,
    /// Membership in a mutually exclusive union group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union_id: Option<String>,
    #[serde(default = "default_allow_publish")]
    pub allow_publish: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_allow_publish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_id: Option<String>,
    /// Opaque key/value binding data persisted per connector.
    #[serde(default)]
    pub bind_info: HashMap<String, String>,
    /// Seed parameters for the second-party authorization redirect.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub auth_login_info: HashMap<String, String>,
    /// JSON blob with extra display hints (e.g. a hover tooltip).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_extra: Option<String>,
}

fn default_allow_publish() -> bool {
    true
}

impl Connector {
    pub fn is_template(&self) -> bool {
        self.id.as_str() == TEMPLATE_CONNECTOR_ID
    }

    pub fn is_web_sdk(&self) -> bool {
        self.classification == ConnectorClassification::ApiOrSdk
            && self.bind_type == BindType::WebSdkBind
    }

    pub fn is_store(&self) -> bool {
        self.bind_type == BindType::StoreBind
    }

    pub fn is_bound(&self) -> bool {
        self.bind_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// One declared member of a union group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionOption {
    pub connector_id: ConnectorId,
    #[serde(default)]
    pub show_name: String,
}

/// Display metadata and declared members of a union group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub connector_options: Vec<UnionOption>,
}

/// Union id -> selected member.
pub type UnionSelections = HashMap<String, ConnectorId>;

/// A workflow (chat-flow) chosen for a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedWorkflow {
    pub workflow_id: String,
    #[serde(default)]
    pub workflow_name: String,
}

/// Per-connector publish configuration sent alongside the bind info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorPublishConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_workflows: Option<Vec<SelectedWorkflow>>,
}

impl ConnectorPublishConfig {
    pub fn with_workflow(workflow_id: impl Into<String>, workflow_name: impl Into<String>) -> Self {
        Self {
            selected_workflows: Some(vec![SelectedWorkflow {
                workflow_id: workflow_id.into(),
                workflow_name: workflow_name.into(),
            }]),
        }
    }

    /// First chosen workflow id, ignoring blank ids.
    pub fn first_workflow_id(&self) -> Option<&str> {
        self.selected_workflows
            .as_ref()
            .and_then(|w| w.first())
            .map(|w| w.workflow_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Summary of the previous publish, used to seed default selections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastPublishInfo {
    #[serde(default)]
    pub version_number: String,
    #[serde(default)]
    pub connector_ids: Vec<ConnectorId>,
    #[serde(default)]
    pub connector_publish_config: HashMap<ConnectorId, ConnectorPublishConfig>,
}

/// Response of `ListConnectors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorListing {
    #[serde(default)]
    pub connector_list: Vec<Connector>,
    #[serde(default)]
    pub connector_union_info_map: HashMap<String, UnionInfo>,
    #[serde(default)]
    pub last_publish_info: LastPublishInfo,
}

/// Keys of the store-bind configuration that must be set before publishing.
pub const STORE_REQUIRED_FIELDS: [&str; 2] = ["display_screen", "category"];
