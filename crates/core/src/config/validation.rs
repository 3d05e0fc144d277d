//! Checks run on `AppConfig` once every layer has been merged.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MAX_BODY_LIMIT: usize = 50 * 1024 * 1024;
const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=300_000;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is outside 100ms ..= 5 minutes
    /// - `user_agent` is empty
    /// - `origin` is not an http(s) URL with a host
    ///
    /// Returns `ConfigError::Missing` if `bootstrap_path` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BODY_LIMIT).contains(&self.max_bytes) {
            return Err(invalid("max_bytes", "must be between 1 byte and 50MB"));
        }
        if !TIMEOUT_RANGE_MS.contains(&self.timeout_ms) {
            return Err(invalid("timeout_ms", "must be between 100ms and 5 minutes (300000ms)"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.bootstrap_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "bootstrap_path".into(),
                hint: "Set OFFSHELL_BOOTSTRAP_PATH to the manifest builder's output".into(),
            });
        }

        let origin = self.origin_url()?;
        if origin.path() != "/" || origin.query().is_some() {
            tracing::warn!(origin = %origin, "origin carries a path or query; only scheme, host and port are used");
        }

        Ok(())
    }
}
