//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Names the parser factory recognizes.
const KNOWN_PARSERS: &[&str] = &["local", "microlink", "jsonlink", "iframely", "linkpreview"];

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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `parsers` is empty
    /// - `max_concurrency` is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `save_images_to_vault` is set
    /// without a `vault_path`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parsers.is_empty() {
            return Err(ConfigError::Invalid { field: "parsers".into(), reason: "must name at least one parser".into() });
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid { field: "max_concurrency".into(), reason: "must be at least 1".into() });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.save_images_to_vault && self.vault_path.is_none() {
            return Err(ConfigError::Missing {
                field: "vault_path".into(),
                hint: "Set LINKCARD_VAULT_PATH or disable save_images_to_vault".into(),
            });
        }

        for name in &self.parsers {
            if !KNOWN_PARSERS.contains(&name.as_str()) {
                tracing::warn!(parser = %name, "unknown parser in fallback list; it will fail when tried");
            }
        }

        Ok(())
    }
}
