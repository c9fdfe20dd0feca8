use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpVaultError};
use crate::handlers::collect_upload_parts;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chunkvault_core::{FileMetadata, FileRecord, VaultError};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Ingestion mode requested by the client.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Persist every chunk before responding; the record is terminal.
    Sync,
    /// Queue the chunks and respond immediately with a pending record.
    #[default]
    Async,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub mode: UploadMode,
}

/// Multipart upload body. Only used by the OpenAPI schema; handlers drain
/// the multipart stream directly.
#[derive(ToSchema)]
pub struct UploadForm {
    /// Raw file content
    #[schema(value_type = String, format = Binary)]
    pub file: String,
    /// Display name; defaults to the file part's filename
    pub name: Option<String>,
    pub description: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v0/files",
    tag = "files",
    params(
        ("mode" = Option<String>, Query, description = "Ingestion mode: 'sync' waits until every chunk is persisted, 'async' (default) returns a pending record immediately")
    ),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File accepted", body = FileRecord),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpVaultError> {
    let parts = collect_upload_parts(multipart).await?;

    let Some(file) = parts.file else {
        return Err(
            VaultError::InvalidInput("Missing 'file' part in multipart body".to_string()).into(),
        );
    };

    let name = parts.name.or(file.filename).ok_or_else(|| {
        VaultError::InvalidInput(
            "Missing file name: supply a 'name' part or a filename on the file part".to_string(),
        )
    })?;

    let metadata = FileMetadata {
        name,
        description: parts.description,
        content_type: file
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
    };

    let record = match query.mode {
        UploadMode::Sync => {
            state
                .files
                .upload_sync(owner.owner_id, metadata, file.data)
                .await?
        }
        UploadMode::Async => {
            state
                .files
                .upload_async(owner.owner_id, metadata, file.data)
                .await?
        }
    };

    Ok((StatusCode::CREATED, Json(record)))
}
