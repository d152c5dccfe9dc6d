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

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - a keynav selector or the link attribute is empty
    /// - `keynav.focus_delay_ms` exceeds one minute
    /// - `offline.worker_script` is empty or absolute
    /// - `offline.network_timeout_ms` is below 100ms
    /// - `offline.max_entries` is 0
    /// - a route pattern is not a valid regular expression
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let keynav = &self.keynav;
        for (field, value) in [
            ("keynav.previous_selector", &keynav.previous_selector),
            ("keynav.next_selector", &keynav.next_selector),
            ("keynav.toc_selector", &keynav.toc_selector),
            ("keynav.link_attribute", &keynav.link_attribute),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        if keynav.focus_delay_ms > 60_000 {
            return Err(invalid("keynav.focus_delay_ms", "must not exceed 60000ms"));
        }

        let offline = &self.offline;
        if offline.worker_script.trim().is_empty() {
            return Err(invalid("offline.worker_script", "must not be empty"));
        }
        if offline.worker_script.contains("://") {
            return Err(invalid("offline.worker_script", "must be relative to the page"));
        }
        if let Some(ms) = offline.network_timeout_ms
            && ms < 100
        {
            return Err(invalid("offline.network_timeout_ms", "must be at least 100ms"));
        }
        if offline.max_entries == Some(0) {
            return Err(invalid("offline.max_entries", "must be greater than 0"));
        }
        for route in &offline.routes {
            if let Err(e) = regex::Regex::new(&route.pattern) {
                return Err(invalid("offline.routes", format!("bad pattern {:?}: {e}", route.pattern)));
            }
        }

        if offline.enabled && offline.routes.is_empty() {
            tracing::warn!("offline.routes is empty; workers will pass every request to the network");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteSettings, StrategyKind};

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
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
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_empty_selector() {
        let mut config = AppConfig::default();
        config.keynav.toc_selector = "  ".into();
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "keynav.toc_selector"));
    }

    #[test]
    fn test_validate_absolute_worker_script() {
        let mut config = AppConfig::default();
        config.offline.worker_script = "https://cdn.example.com/sw.js".into();
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "offline.worker_script"));
    }

    #[test]
    fn test_validate_bad_route_pattern() {
        let mut config = AppConfig::default();
        config.offline.routes.push(RouteSettings::new(r"\.(png", StrategyKind::CacheFirst));
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "offline.routes"));
    }

    #[test]
    fn test_validate_zero_max_entries() {
        let mut config = AppConfig::default();
        config.offline.max_entries = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let mut config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() };
        config.offline.network_timeout_ms = Some(100);
        config.keynav.focus_delay_ms = 0;
        assert!(config.validate().is_ok());
    }
}
