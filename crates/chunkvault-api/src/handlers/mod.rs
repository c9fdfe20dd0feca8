//! Request handlers.

pub mod delete;
pub mod download;
pub mod files;
pub mod health;
pub mod update;
pub mod upload;

use axum::extract::Multipart;
use bytes::Bytes;
use chunkvault_core::VaultError;

/// The `file` part of a multipart request.
pub struct FilePart {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Fields accepted on upload and update requests. Unknown parts are ignored.
#[derive(Default)]
pub struct UploadParts {
    pub file: Option<FilePart>,
    pub name: Option<String>,
    pub description: Option<String>,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> VaultError {
    VaultError::InvalidInput(format!("Malformed multipart body: {}", e))
}

/// Drain a multipart body into its known parts. The `file` part is buffered
/// fully; the request body limit layers bound its size before it gets here.
pub async fn collect_upload_parts(mut multipart: Multipart) -> Result<UploadParts, VaultError> {
    let mut parts = UploadParts::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                parts.file = Some(FilePart {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("name") => {
                parts.name = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("description") => {
                parts.description = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(parts)
}
