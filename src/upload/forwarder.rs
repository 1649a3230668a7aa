//! Upload forwarder
//!
//! Builds the object key for an uploaded file, PUTs it to storage and returns
//! the public URL wrapped in an [`ApiResult`].

use super::{build_object_key, FileUpload, UploadError};
use crate::config::{Config, UploadConfig};
use crate::date::{now_millis, DateFormatter};
use crate::envelope::ApiResult;
use crate::metrics;
use crate::upyun::{encode_key, ObjectStore, UpyunClient, UpyunClientConfig, UpyunError};
use std::sync::Arc;
use std::time::Instant;

/// Forwards uploads to an [`ObjectStore`]
pub struct UploadForwarder {
    store: Arc<dyn ObjectStore>,
    domain: String,
    folder_pattern: String,
    formatter: DateFormatter,
    unique_suffix: bool,
}

impl UploadForwarder {
    /// Create a forwarder over any object store
    pub fn new(store: Arc<dyn ObjectStore>, domain: &str, upload: &UploadConfig) -> Self {
        Self {
            store,
            domain: domain.trim_end_matches('/').to_string(),
            folder_pattern: upload.folder_pattern.clone(),
            formatter: DateFormatter::new(upload.on_invalid_date),
            unique_suffix: upload.unique_suffix,
        }
    }

    /// Create a forwarder backed by an UpYun client built from `config`
    pub fn from_config(config: &Config) -> Result<Self, UpyunError> {
        let client = UpyunClient::new(UpyunClientConfig::from(&config.storage))?;
        Ok(Self::new(
            Arc::new(client),
            &config.storage.domain,
            &config.upload,
        ))
    }

    /// Folder used when the client supplies none
    pub fn default_folder(&self) -> String {
        self.formatter.format_now(&self.folder_pattern)
    }

    /// Object key for `file_name` in `folder` (or the default folder)
    pub fn object_key(&self, file_name: &str, folder: Option<&str>) -> String {
        let folder = match folder {
            Some(folder) if !folder.trim().is_empty() => folder.to_string(),
            _ => self.default_folder(),
        };

        let mut stem = now_millis().to_string();
        if self.unique_suffix {
            let id = uuid::Uuid::new_v4().simple().to_string();
            stem.push('-');
            stem.push_str(&id[..8]);
        }

        build_object_key(&folder, &stem, file_name)
    }

    /// Public URL for an object key, encoded the same way as the PUT URL
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.domain, encode_key(key))
    }

    /// Upload `file` and return its public URL
    #[tracing::instrument(
        name = "upload.forward",
        skip(self, file),
        fields(
            upload.file_name = %file.name,
            upload.bytes = file.size(),
            upload.key = tracing::field::Empty
        ),
        err
    )]
    pub async fn try_forward(
        &self,
        file: FileUpload,
        folder: Option<&str>,
    ) -> Result<String, UploadError> {
        let key = self.object_key(&file.name, folder);
        tracing::Span::current().record("upload.key", key.as_str());

        let bytes_written = file.size();
        let start_time = Instant::now();
        let result = self.store.put_object(&key, file.bytes).await;
        let duration = start_time.elapsed();
        metrics::record_upload_duration(duration.as_secs_f64());

        match result {
            Ok(()) => {
                metrics::record_upload_success(bytes_written);
                tracing::info!(
                    key = %key,
                    bytes_written = bytes_written,
                    duration_ms = duration.as_millis(),
                    "Upload forwarded"
                );
                Ok(self.public_url(&key))
            }
            Err(e) => {
                metrics::record_upload_failure();
                metrics::record_error(match &e {
                    UpyunError::Status { .. } => "provider_status",
                    UpyunError::Transport(_) => "transport",
                    UpyunError::ConfigError(_) => "config",
                    UpyunError::SigningError(_) => "signing",
                });
                Err(e.into())
            }
        }
    }

    /// Upload `file` and wrap the outcome in an envelope
    ///
    /// Provider statuses and transport errors both become code 500 with the
    /// provider's status text or the transport error message.
    pub async fn forward(&self, file: FileUpload, folder: Option<&str>) -> ApiResult<String> {
        match self.try_forward(file, folder).await {
            Ok(url) => ApiResult::success(url),
            Err(e) => ApiResult::fail(e.to_string()),
        }
    }
}
