use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpVaultError};
use crate::handlers::collect_upload_parts;
use crate::handlers::upload::UploadForm;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use chunkvault_core::{FileRecord, UpdateFileMetadata};
use chunkvault_ingest::ReplacementContent;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    put,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated file", body = FileRecord),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpVaultError> {
    let parts = collect_upload_parts(multipart).await?;

    let patch = UpdateFileMetadata {
        name: parts.name,
        description: parts.description,
    };
    // A file part means full content replacement; its content type, when
    // present, replaces the stored one.
    let replacement = parts.file.map(|file| ReplacementContent {
        content_type: file.content_type,
        data: file.data,
    });

    let record = state
        .files
        .update(id, owner.owner_id, patch, replacement)
        .await?;

    Ok(Json(record))
}
