//! Configuration loading for the gateway client.
//!
//! Config comes from a TOML file, with environment variables taking
//! precedence for the secrets that should not live on disk.

use serde::Deserialize;
use std::path::Path;
use voltaic_core::error::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "VOLTAIC_CONFIG";
/// Environment override for the API key.
pub const API_KEY_ENV: &str = "VOLTAIC_API_KEY";
/// Environment override for the bearer token.
pub const BEARER_TOKEN_ENV: &str = "VOLTAIC_BEARER_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the remote entity gateway, without a trailing slash.
    pub base_url: String,
    /// Tenant every request is scoped to.
    pub tenant_id: uuid::Uuid,
    pub auth: AuthConfig,
    pub request_timeout_ms: u64,
    /// Default page limit for list/filter calls when the caller passes none.
    pub default_list_limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

impl GatewayConfig {
    /// Load from the path named by `VOLTAIC_CONFIG`, applying env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).map_err(|_| ConfigError::MissingRequired {
            field: CONFIG_PATH_ENV.to_string(),
        })?;
        Self::from_path(Path::new(&path))
    }

    /// Load from an explicit path, applying env overrides and validating.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let mut config: GatewayConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::Unreadable {
                reason: format!("{}: {}", path.display(), e),
            })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Secrets from the environment win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            self.auth.api_key = Some(api_key);
        }
        if let Ok(token) = std::env::var(BEARER_TOKEN_ENV) {
            self.auth.bearer_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if self.auth.api_key.is_none() && self.auth.bearer_token.is_none() {
            return Err(ConfigError::MissingRequired {
                field: "auth.api_key or auth.bearer_token".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.default_list_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_list_limit".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
