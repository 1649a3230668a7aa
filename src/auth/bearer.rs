//! Shared-secret bearer authentication
//!
//! Clients send `Authorization: Bearer <base64(AUTH_CODE)>`. The expected token
//! is derived once at construction; each request is checked against it with a
//! constant-time comparison.

use super::{AuthError, AuthRequest, AuthResult, Authenticator};
use crate::encoding::{base64_encode, EncodeError};
use crate::metrics;
use async_trait::async_trait;

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticator for a single process-wide shared secret
///
/// # Example
///
/// ```
/// use upyun_relay::auth::SharedSecretAuthenticator;
///
/// let auth = SharedSecretAuthenticator::new("secret").unwrap();
/// assert!(auth.verify(Some("Bearer c2VjcmV0")).is_ok());
/// assert!(auth.verify(Some("Bearer nope")).is_err());
/// assert!(auth.verify(None).is_err());
/// ```
pub struct SharedSecretAuthenticator {
    expected_token: String,
}

impl SharedSecretAuthenticator {
    /// Create an authenticator for `auth_code`
    ///
    /// Fails if the secret contains characters outside Latin-1.
    pub fn new(auth_code: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            expected_token: base64_encode(auth_code)?,
        })
    }

    /// Check a raw `Authorization` header value
    pub fn verify(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let token = authorization
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .ok_or(AuthError::MissingAuth)?;

        if constant_time_eq(token.as_bytes(), self.expected_token.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

impl std::fmt::Debug for SharedSecretAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretAuthenticator")
            .field("expected_token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Authenticator for SharedSecretAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError> {
        let outcome = self.verify(request.header("authorization"));
        metrics::record_auth_attempt(outcome.is_ok());

        match outcome {
            Ok(()) => Ok(AuthResult { method: "bearer" }),
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    reason = e.kind(),
                    "Rejected request"
                );
                Err(e)
            }
        }
    }
}

/// Constant-time comparison of byte slices.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
