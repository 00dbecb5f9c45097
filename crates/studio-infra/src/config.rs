//! Studio configuration loader.
//!
//! Reads `studio.toml` from the data directory and deserializes it into
//! [`StudioConfig`]. A missing or malformed file falls back to defaults.

use std::path::Path;

use anyhow::Context;

use studio_types::config::StudioConfig;

pub const CONFIG_FILE: &str = "studio.toml";

/// Polling faster than this would hammer the backend.
const MIN_POLL_INTERVAL_MS: u64 = 500;

/// Load `{data_dir}/studio.toml`.
///
/// - Missing file: [`StudioConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
/// - Otherwise the parsed config, with intervals and the error bound clamped
///   to their floors.
pub async fn load_studio_config(data_dir: &Path) -> StudioConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    match tokio::fs::try_exists(&config_path).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return StudioConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to stat {}: {err}, using defaults", config_path.display());
            return StudioConfig::default();
        }
    }

    match read_studio_config(&config_path).await {
        Ok(config) => sanitize(config),
        Err(err) => {
            tracing::warn!("{err:#}, using defaults");
            StudioConfig::default()
        }
    }
}

/// Read and parse one config file, failing on any error.
pub async fn read_studio_config(path: &Path) -> anyhow::Result<StudioConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Enforce minimums on the timing fields.
pub fn sanitize(mut config: StudioConfig) -> StudioConfig {
    config.poll_interval_ms = config.poll_interval_ms.max(MIN_POLL_INTERVAL_MS);
    config.latest_status_interval_ms = config.latest_status_interval_ms.max(MIN_POLL_INTERVAL_MS);
    config.max_consecutive_poll_errors = config.max_consecutive_poll_errors.max(1);
    config.request_timeout_secs = config.request_timeout_secs.max(1);
    config
}
