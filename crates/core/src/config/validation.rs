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
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` or `user_agent` is empty
    /// - `origin` or `scope` does not form a valid URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `min_query_len` is outside 2-4
    /// - `query_cache_capacity`, `search_limit` or `suggest_limit` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "version".into(), reason: "must not be empty".into() });
        }

        self.scope_url()?;

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if !(2..=4).contains(&self.min_query_len) {
            return Err(ConfigError::Invalid { field: "min_query_len".into(), reason: "must be between 2 and 4".into() });
        }

        if self.query_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "query_cache_capacity".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.search_limit == 0 {
            return Err(ConfigError::Invalid { field: "search_limit".into(), reason: "must be greater than 0".into() });
        }

        if self.suggest_limit == 0 || self.suggest_limit > self.search_limit {
            return Err(ConfigError::Invalid {
                field: "suggest_limit".into(),
                reason: "must be between 1 and search_limit".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !self.api_prefix.starts_with('/') || !self.search_endpoint.starts_with(&self.api_prefix) {
            return Err(ConfigError::Invalid {
                field: "search_endpoint".into(),
                reason: "must live under api_prefix".into(),
            });
        }

        for asset in &self.static_assets {
            self.resolve(asset)?;
        }

        if self.quota_bytes < 1024 * 1024 {
            tracing::warn!(quota_bytes = self.quota_bytes, "partition quota below 1MB; app shell may not fit");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = AppConfig { origin: "not an origin".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_min_query_len_range() {
        for len in [1, 5] {
            let config = AppConfig { min_query_len: len, ..Default::default() };
            let result = config.validate();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "min_query_len"));
        }
        for len in 2..=4 {
            let config = AppConfig { min_query_len: len, ..Default::default() };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_validate_zero_capacity() {
        let config = AppConfig { query_cache_capacity: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "query_cache_capacity"));
    }

    #[test]
    fn test_validate_suggest_limit_above_search_limit() {
        let config = AppConfig { search_limit: 5, suggest_limit: 10, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "suggest_limit"));
    }

    #[test]
    fn test_validate_search_endpoint_outside_api() {
        let config = AppConfig { search_endpoint: "/buscar".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "search_endpoint"));
    }
}
