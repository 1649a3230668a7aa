//! HTTP server module
//!
//! Handles incoming HTTP requests and routes them to appropriate handlers.

use crate::auth::{Authenticator, SharedSecretAuthenticator};
use crate::config::Config;
use crate::router::Router;
use crate::upload::UploadForwarder;
use std::sync::Arc;
use thiserror::Error;

pub mod handler;
pub mod relay;

pub use relay::RelayServer;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Startup error: {0}")]
    StartupError(String),
}

/// Immutable state shared by every request
pub struct AppState {
    pub router: Router,
    pub authenticator: Arc<dyn Authenticator>,
    pub forwarder: UploadForwarder,
    pub max_file_size: u64,
    pub metrics_enabled: bool,
}

impl AppState {
    /// Build request state from validated configuration
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let authenticator = SharedSecretAuthenticator::new(&config.auth.auth_code)
            .map_err(|e| ServerError::StartupError(format!("auth.auth_code: {}", e)))?;
        let forwarder = UploadForwarder::from_config(config)
            .map_err(|e| ServerError::StartupError(format!("storage: {}", e)))?;

        Ok(Self {
            router: Router::new(&config.server.base_path),
            authenticator: Arc::new(authenticator),
            forwarder,
            max_file_size: config.upload.max_file_size,
            metrics_enabled: config.metrics.enabled,
        })
    }
}
