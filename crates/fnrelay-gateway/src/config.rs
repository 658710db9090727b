use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid gateway config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("gateway config failed validation: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("mount root must begin with '/', got {0:?}")]
    MountRoot(String),
}

/// Gateway settings. Every resolved path carries `mount_root`; the guard
/// answers 504 after `timeout_secs` without a completion.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    #[validate(length(min = 1))]
    pub mount_root: String,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mount_root: "/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(contents)?;
        config.validate()?;
        if !config.mount_root.starts_with('/') {
            return Err(ConfigError::MountRoot(config.mount_root));
        }
        Ok(config)
    }

    pub fn mount_root(&self) -> &str {
        &self.mount_root
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
