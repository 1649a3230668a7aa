//! UpYun storage client
//!
//! Uploads objects through the UpYun REST API: `PUT <endpoint>/<bucket>/<key>`
//! authenticated with HTTP Basic credentials and carrying `Date` and
//! `Content-Length` headers. HTTP 200 is the only success status.
//!
//! # Example
//!
//! ```no_run
//! use upyun_relay::upyun::{UpyunClient, UpyunClientConfig};
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UpyunClientConfig {
//!     endpoint: "https://v0.api.upyun.com".to_string(),
//!     bucket: "my-bucket".to_string(),
//!     operator: "operator".to_string(),
//!     password: "password".to_string(),
//!     timeout: None,
//! };
//!
//! let client = UpyunClient::new(config)?;
//! client.put_object("2024/01/05/1704445687000.png", Bytes::from("...")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Tracing
//!
//! `put_object` runs in a span named `upyun.put_object` with the bucket, key,
//! byte count and, once the provider answers, `http.status_code`.

use crate::encoding::{basic_auth, EncodeError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, DATE};
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Characters escaped in object keys. `/` is kept as the folder separator.
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode an object key for use in a URL path.
///
/// ```
/// use upyun_relay::upyun::encode_key;
///
/// assert_eq!(encode_key("/a#b/c d.png"), "a%23b/c%20d.png");
/// ```
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key.trim_start_matches('/'), KEY_ENCODE_SET).to_string()
}

/// UpYun client errors
#[derive(Error, Debug)]
pub enum UpyunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Signing error: {0}")]
    SigningError(#[from] EncodeError),

    /// The provider answered with a status other than 200
    #[error("{status_text}")]
    Status { status: u16, status_text: String },

    /// The provider could not be reached
    #[error("{0}")]
    Transport(String),
}

/// UpYun client configuration
#[derive(Clone)]
pub struct UpyunClientConfig {
    pub endpoint: String,
    pub bucket: String,
    pub operator: String,
    pub password: String,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for UpyunClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpyunClientConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("operator", &self.operator)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl From<&crate::config::StorageConfig> for UpyunClientConfig {
    fn from(storage: &crate::config::StorageConfig) -> Self {
        Self {
            endpoint: storage.endpoint.clone(),
            bucket: storage.bucket.clone(),
            operator: storage.operator.clone(),
            password: storage.password.clone(),
            timeout: Some(Duration::from_secs(storage.timeout_seconds)),
        }
    }
}

/// Object store seam used by the upload forwarder
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`
    async fn put_object(&self, key: &str, body: Bytes) -> Result<(), UpyunError>;
}

/// UpYun REST client
pub struct UpyunClient {
    config: UpyunClientConfig,
    authorization: String,
    http_client: reqwest::Client,
}

impl UpyunClient {
    /// Create a new client
    ///
    /// The Basic credential is computed here, so operator names or passwords
    /// outside Latin-1 fail at startup rather than per request.
    pub fn new(config: UpyunClientConfig) -> Result<Self, UpyunError> {
        let authorization = basic_auth(&config.operator, &config.password)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| UpyunError::ConfigError(e.to_string()))?;

        Ok(Self {
            config,
            authorization,
            http_client,
        })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Get the endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Full URL for an object key
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            encode_key(key)
        )
    }

    /// The `Authorization` header value sent to the provider
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// Upload an object
    #[tracing::instrument(
        name = "upyun.put_object",
        skip(self, body),
        fields(
            upyun.bucket = %self.config.bucket,
            upyun.key = %key,
            http.method = "PUT",
            upload.bytes = body.len(),
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    pub async fn put_object(&self, key: &str, body: Bytes) -> Result<(), UpyunError> {
        let content_length = body.len().to_string();
        let date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let response = self
            .http_client
            .put(self.object_url(key))
            .header(DATE, date)
            .header(CONTENT_LENGTH, content_length)
            .header(AUTHORIZATION, &self.authorization)
            .body(body)
            .send()
            .await
            .map_err(|e| UpyunError::Transport(e.to_string()))?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        if status == StatusCode::OK {
            tracing::debug!("PutObject completed");
            Ok(())
        } else {
            Err(UpyunError::Status {
                status: status.as_u16(),
                status_text: status_text(status),
            })
        }
    }
}

#[async_trait]
impl ObjectStore for UpyunClient {
    async fn put_object(&self, key: &str, body: Bytes) -> Result<(), UpyunError> {
        UpyunClient::put_object(self, key, body).await
    }
}

/// Reason phrase for a status, falling back to the numeric code
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
