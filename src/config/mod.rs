//! Configuration module for upyun-relay
//!
//! Configuration comes either from a YAML file (with `${VAR}` and
//! `${VAR:-default}` expansion) or straight from the process environment.
//! Either way it is validated once at startup and never mutated afterwards.
//!
//! # Example
//!
//! ```yaml
//! server:
//!   address: "0.0.0.0:8787"
//! auth:
//!   auth_code: "${AUTH_CODE}"
//! storage:
//!   bucket: "${BUCKET}"
//!   operator: "${OPERATOR}"
//!   password: "${PASSWORD}"
//!   domain: "https://cdn.example.com"
//! upload:
//!   folder_pattern: "YYYY/MM/DD"
//!   on_invalid_date: use_current_time
//! ```

use crate::date::{InvalidDatePolicy, DEFAULT_FOLDER_PATTERN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
fn expand_env_vars(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

/// Deserialize a string and expand environment variables in it.
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn require(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!("{} must not be empty", name)));
    }
    if value.contains("${") {
        return Err(ConfigError::ValidationError(format!(
            "{} references an unset environment variable",
            name
        )));
    }
    Ok(())
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Build configuration from the process environment
    ///
    /// Reads `BUCKET`, `OPERATOR`, `PASSWORD`, `DOMAIN` and `AUTH_CODE`
    /// (required) plus `RELAY_ADDRESS` and `UPYUN_ENDPOINT` (optional).
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::from_env()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::ValidationError("server.address must not be empty".into()));
        }

        if !self.server.base_path.starts_with('/') || self.server.base_path.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "server.base_path '{}' must start with '/' and not end with '/'",
                self.server.base_path
            )));
        }

        require("auth.auth_code", &self.auth.auth_code)?;
        require("storage.bucket", &self.storage.bucket)?;
        require("storage.operator", &self.storage.operator)?;
        require("storage.password", &self.storage.password)?;
        require("storage.domain", &self.storage.domain)?;

        if !is_valid_http_url(&self.storage.endpoint) {
            return Err(ConfigError::ValidationError(
                "Invalid storage endpoint: must start with http:// or https://".into(),
            ));
        }

        if !is_valid_http_url(&self.storage.domain) {
            return Err(ConfigError::ValidationError(
                "Invalid storage domain: must start with http:// or https://".into(),
            ));
        }

        if self.storage.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "storage.timeout_seconds must be greater than 0".into(),
            ));
        }

        if self.upload.folder_pattern.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "upload.folder_pattern must not be empty".into(),
            ));
        }

        if self.upload.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_file_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address", deserialize_with = "deserialize_with_env")]
    pub address: String,
    /// Prefix for API routes. Default: "/api"
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            base_path: default_base_path(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_base_path() -> String {
    "/api".to_string()
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret; clients send `Bearer <base64(auth_code)>`
    #[serde(deserialize_with = "deserialize_with_env")]
    pub auth_code: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_code", &"<redacted>")
            .finish()
    }
}

/// Storage provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// REST API base URL. Default: "https://v0.api.upyun.com"
    #[serde(default = "default_endpoint", deserialize_with = "deserialize_with_env")]
    pub endpoint: String,
    #[serde(deserialize_with = "deserialize_with_env")]
    pub bucket: String,
    #[serde(deserialize_with = "deserialize_with_env")]
    pub operator: String,
    #[serde(deserialize_with = "deserialize_with_env")]
    pub password: String,
    /// Public URL prefix returned to clients
    #[serde(deserialize_with = "deserialize_with_env")]
    pub domain: String,
    /// Timeout for the storage PUT in seconds. Default: 30
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("operator", &self.operator)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

pub(crate) fn default_endpoint() -> String {
    "https://v0.api.upyun.com".to_string()
}

pub(crate) fn default_timeout_seconds() -> u64 {
    30
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Date pattern for the folder used when the client sends none
    #[serde(default = "default_folder_pattern")]
    pub folder_pattern: String,
    #[serde(default)]
    pub on_invalid_date: InvalidDatePolicy,
    /// Append a random suffix to object names so same-millisecond uploads
    /// to one folder do not overwrite each other
    #[serde(default)]
    pub unique_suffix: bool,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            folder_pattern: default_folder_pattern(),
            on_invalid_date: InvalidDatePolicy::default(),
            unique_suffix: false,
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_folder_pattern() -> String {
    DEFAULT_FOLDER_PATTERN.to_string()
}

fn default_max_file_size() -> u64 {
    104857600 // 100MB
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}
