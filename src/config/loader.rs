//! Configuration loader

use super::{
    default_endpoint, default_timeout_seconds, AuthConfig, Config, ConfigError, MetricsConfig,
    ServerConfig, StorageConfig, UploadConfig,
};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
        };

        let mut server = ServerConfig::default();
        if let Some(address) = lookup("RELAY_ADDRESS") {
            server.address = address;
        }

        let config = Config {
            server,
            auth: AuthConfig {
                auth_code: required("AUTH_CODE")?,
            },
            storage: StorageConfig {
                endpoint: lookup("UPYUN_ENDPOINT").unwrap_or_else(default_endpoint),
                bucket: required("BUCKET")?,
                operator: required("OPERATOR")?,
                password: required("PASSWORD")?,
                domain: required("DOMAIN")?,
                timeout_seconds: default_timeout_seconds(),
            },
            upload: UploadConfig::default(),
            metrics: MetricsConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }
}
