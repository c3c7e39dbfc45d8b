//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `version` or `upstream` is unset,
    /// and `ConfigError::Invalid` if:
    /// - `upstream` is not an http(s) origin or `listen` is not a socket address
    /// - `offline_fallback` is not listed in the manifest
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "version".into(),
                hint: "Set LARDER_VERSION environment variable".into(),
            });
        }

        if self.upstream.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "upstream".into(),
                hint: "Set LARDER_UPSTREAM environment variable".into(),
            });
        }

        self.upstream_url()?;
        self.listen_addr()?;

        if let Some(fallback) = &self.offline_fallback
            && !self.manifest.contains(fallback)
        {
            return Err(ConfigError::Invalid {
                field: "offline_fallback".into(),
                reason: "must be listed in the manifest so it is precached".into(),
            });
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

        if self.manifest.is_empty() {
            tracing::warn!("manifest is empty; nothing will be precached on install");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            version: "v1".into(),
            upstream: "http://localhost:3000".into(),
            manifest: vec!["/index.html".into(), "/app.js".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_version() {
        let config = AppConfig { version: "  ".into(), ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_missing_upstream() {
        let config = AppConfig { upstream: String::new(), ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "upstream"));
    }

    #[test]
    fn test_validate_bad_upstream() {
        let config = AppConfig { upstream: "not a url".into(), ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "upstream"));
    }

    #[test]
    fn test_validate_fallback_must_be_in_manifest() {
        let config = AppConfig { offline_fallback: Some("/offline.html".into()), ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "offline_fallback"));

        let mut config = valid_config();
        config.manifest.push("/offline.html".into());
        config.offline_fallback = Some("/offline.html".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_exceeds_limit() {
        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..valid_config() }; // 51MB
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..valid_config() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..valid_config() }; // minimum valid values
        assert!(config.validate().is_ok());
    }
}
