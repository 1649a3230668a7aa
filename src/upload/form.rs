//! Multipart form parsing for `POST /upload`
//!
//! Fields: `file` (required, binary) and `folder` (optional text). Unknown
//! fields are read and discarded.

use super::FileUpload;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use multer::{Constraints, Multipart, SizeLimit};
use thiserror::Error;

/// Longest accepted `folder` value in bytes
pub const MAX_FOLDER_BYTES: u64 = 1024;

/// Room for boundaries, part headers and small text fields on top of the file
const FORM_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Form errors
///
/// The display strings are returned verbatim to API clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("请求必须是 multipart/form-data")]
    NotMultipart,

    #[error("无效的表单数据: {0}")]
    Malformed(String),

    #[error("缺少上传文件")]
    MissingFile,

    #[error("文件大小超过限制 ({limit} 字节)")]
    TooLarge { limit: u64 },
}

impl FormError {
    /// Envelope code for this error
    pub fn code(&self) -> u16 {
        match self {
            FormError::TooLarge { .. } => 413,
            _ => 400,
        }
    }
}

/// Parsed upload form
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub file: FileUpload,
    /// `None` when absent or blank
    pub folder: Option<String>,
}

/// Extract the multipart boundary from a `Content-Type` value
pub fn boundary_from_content_type(content_type: Option<&str>) -> Result<String, FormError> {
    let content_type = content_type.ok_or(FormError::NotMultipart)?;
    multer::parse_boundary(content_type).map_err(|_| FormError::NotMultipart)
}

/// Read an upload form from a body stream
///
/// The `file` field is buffered in memory and rejected once it grows past
/// `max_file_size` bytes. The `folder` field is capped at
/// [`MAX_FOLDER_BYTES`] and the whole body at `max_file_size` plus a fixed
/// allowance for form framing.
pub async fn parse_upload_form<S, O, E>(
    stream: S,
    boundary: &str,
    max_file_size: u64,
) -> Result<UploadForm, FormError>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .whole_stream(max_file_size.saturating_add(FORM_OVERHEAD_BYTES))
            .for_field("folder", MAX_FOLDER_BYTES),
    );
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);
    let malformed = |e: multer::Error| match e {
        multer::Error::FieldSizeExceeded { limit, .. } => FormError::TooLarge { limit },
        multer::Error::StreamSizeExceeded { .. } => FormError::TooLarge {
            limit: max_file_size,
        },
        e => FormError::Malformed(e.to_string()),
    };

    let mut file: Option<FileUpload> = None;
    let mut folder: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("file") => {
                if file.is_some() {
                    return Err(FormError::Malformed("multiple file fields".into()));
                }
                let name = field.file_name().unwrap_or_default().to_string();
                let mut buffer = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    if (buffer.len() + chunk.len()) as u64 > max_file_size {
                        return Err(FormError::TooLarge {
                            limit: max_file_size,
                        });
                    }
                    buffer.extend_from_slice(&chunk);
                }
                file = Some(FileUpload::new(name, buffer.freeze()));
            }
            Some("folder") => {
                let value = field.text().await.map_err(malformed)?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    folder = Some(trimmed.to_string());
                }
            }
            _ => while field.chunk().await.map_err(malformed)?.is_some() {},
        }
    }

    let file = file.ok_or(FormError::MissingFile)?;
    Ok(UploadForm { file, folder })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "X-RELAY-BOUNDARY";

    fn body_stream(
        body: String,
    ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
        futures::stream::once(async move { Ok(Bytes::from(body)) })
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
    }

    fn file_part(filename: &str, content: &str) -> String {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n{}\r\n",
            BOUNDARY, filename, content
        )
    }

    fn closing() -> String {
        format!("--{}--\r\n", BOUNDARY)
    }

    #[test]
    fn test_boundary_from_content_type() {
        let boundary =
            boundary_from_content_type(Some("multipart/form-data; boundary=abc123")).unwrap();
        assert_eq!(boundary, "abc123");
        assert_eq!(
            boundary_from_content_type(Some("application/json")),
            Err(FormError::NotMultipart)
        );
        assert_eq!(boundary_from_content_type(None), Err(FormError::NotMultipart));
    }

    #[tokio::test]
    async fn test_parses_file_and_folder() {
        let body = [
            text_part("folder", "images"),
            text_part("ignored", "whatever"),
            file_part("cat.png", "PNGDATA"),
            closing(),
        ]
        .concat();

        let form = parse_upload_form(body_stream(body), BOUNDARY, 1024)
            .await
            .unwrap();
        assert_eq!(form.folder.as_deref(), Some("images"));
        assert_eq!(form.file.name, "cat.png");
        assert_eq!(form.file.bytes, Bytes::from_static(b"PNGDATA"));
    }

    #[tokio::test]
    async fn test_blank_folder_is_none() {
        let body = [text_part("folder", "  "), file_part("a.txt", "a"), closing()].concat();
        let form = parse_upload_form(body_stream(body), BOUNDARY, 1024)
            .await
            .unwrap();
        assert!(form.folder.is_none());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let body = [text_part("folder", "images"), closing()].concat();
        let err = parse_upload_form(body_stream(body), BOUNDARY, 1024)
            .await
            .unwrap_err();
        assert_eq!(err, FormError::MissingFile);
        assert_eq!(err.code(), 400);
    }

    #[tokio::test]
    async fn test_file_over_limit() {
        let body = [file_part("big.bin", "0123456789"), closing()].concat();
        let err = parse_upload_form(body_stream(body), BOUNDARY, 4)
            .await
            .unwrap_err();
        assert_eq!(err, FormError::TooLarge { limit: 4 });
        assert_eq!(err.code(), 413);
    }

    #[tokio::test]
    async fn test_folder_over_limit() {
        let folder = "a".repeat(MAX_FOLDER_BYTES as usize + 1);
        let body = [
            text_part("folder", &folder),
            file_part("a.txt", "a"),
            closing(),
        ]
        .concat();

        let err = parse_upload_form(body_stream(body), BOUNDARY, 1024 * 1024)
            .await
            .unwrap_err();
        assert_eq!(err, FormError::TooLarge { limit: MAX_FOLDER_BYTES });
        assert_eq!(err.code(), 413);
    }

    #[tokio::test]
    async fn test_oversized_folder_rejected_with_small_file_limit() {
        let folder = "f".repeat(100_000);
        let body = [text_part("folder", &folder), file_part("a.txt", "a"), closing()].concat();

        let err = parse_upload_form(body_stream(body), BOUNDARY, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_folder_at_limit_is_accepted() {
        let folder = "b".repeat(MAX_FOLDER_BYTES as usize);
        let body = [text_part("folder", &folder), file_part("a.txt", "a"), closing()].concat();

        let form = parse_upload_form(body_stream(body), BOUNDARY, 1024)
            .await
            .unwrap();
        assert_eq!(form.folder.map(|f| f.len()), Some(MAX_FOLDER_BYTES as usize));
    }
}
