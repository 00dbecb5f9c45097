//! Configuration types for the publish studio engine.
//!
//! `StudioConfig` is the `studio.toml` file that controls the backend
//! endpoint, polling cadence and draft storage.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::draft::DRAFT_STORAGE_KEY;

/// Top-level engine configuration. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Base URL of the studio backend API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Interval between status reads while a submitted publish is tracked.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Interval for the "latest status" read used outside the publish page.
    #[serde(default = "default_latest_status_interval_ms")]
    pub latest_status_interval_ms: u64,

    /// Consecutive transport errors after which polling gives up.
    #[serde(default = "default_max_consecutive_poll_errors")]
    pub max_consecutive_poll_errors: u32,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Storage key holding the pending publish draft.
    #[serde(default = "default_draft_storage_key")]
    pub draft_storage_key: String,

    /// Maximum length of a version description.
    #[serde(default = "default_description_max_len")]
    pub description_max_len: usize,
}

fn default_api_base_url() -> String {
    "http://localhost:8888/api".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_latest_status_interval_ms() -> u64 {
    5_000
}

fn default_max_consecutive_poll_errors() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_draft_storage_key() -> String {
    DRAFT_STORAGE_KEY.to_string()
}

fn default_description_max_len() -> usize {
    800
}

impl StudioConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn latest_status_interval(&self) -> Duration {
        Duration::from_millis(self.latest_status_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            latest_status_interval_ms: default_latest_status_interval_ms(),
            max_consecutive_poll_errors: default_max_consecutive_poll_errors(),
            request_timeout_secs: default_request_timeout_secs(),
            draft_storage_key: default_draft_storage_key(),
            description_max_len: default_description_max_len(),
        }
    }
}
