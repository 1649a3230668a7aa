//! Upload module
//!
//! Turns an uploaded file into an object key, forwards it to storage and maps
//! the outcome onto the response envelope.

use bytes::Bytes;
use thiserror::Error;

pub mod form;
pub mod forwarder;

pub use form::{parse_upload_form, FormError, UploadForm};
pub use forwarder::UploadForwarder;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Storage(#[from] crate::upyun::UpyunError),
}

/// A file received from a client
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Original file name, possibly empty
    pub name: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Text after the last `.` in `filename`, or `""` when there is no dot.
///
/// ```
/// use upyun_relay::upload::file_extension;
///
/// assert_eq!(file_extension("archive.tar.gz"), "gz");
/// assert_eq!(file_extension("noext"), "");
/// ```
pub fn file_extension(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
}

/// Make `folder` end with `/` and drop leading slashes.
pub fn normalize_folder(folder: &str) -> String {
    let mut folder = folder.trim().trim_start_matches('/').to_string();
    if !folder.is_empty() && !folder.ends_with('/') {
        folder.push('/');
    }
    folder
}

/// Object key `<folder><stem>.<ext>`. The dot is kept even when the
/// extension is empty.
pub fn build_object_key(folder: &str, stem: &str, filename: &str) -> String {
    format!(
        "{}{}.{}",
        normalize_folder(folder),
        stem,
        file_extension(filename)
    )
}
