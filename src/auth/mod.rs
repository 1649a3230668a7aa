//! Authentication module
//!
//! Gates every API request on a bearer token derived from a shared secret.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod bearer;

pub use bearer::SharedSecretAuthenticator;

/// Authentication errors
///
/// The display strings are returned verbatim to API clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or not a `Bearer` credential
    #[error("未经授权的访问")]
    MissingAuth,

    /// A bearer token was presented but does not match
    #[error("无效的令牌")]
    InvalidToken,
}

impl AuthError {
    /// Label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingAuth => "missing",
            AuthError::InvalidToken => "invalid",
        }
    }
}

/// Successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// Scheme that accepted the request
    pub method: &'static str,
}

/// Authenticator trait
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError>;
}

/// Authentication request context
#[derive(Debug, Default)]
pub struct AuthRequest {
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub method: String,
    pub path: String,
}

impl AuthRequest {
    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
