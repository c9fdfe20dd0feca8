use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpVaultError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chunkvault_core::{ChunkInfo, FileRecord};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File found", body = FileRecord),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpVaultError> {
    let record = state.files.get(id, owner.owner_id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/api/v0/files",
    tag = "files",
    responses(
        (status = 200, description = "Caller's files, newest first", body = Vec<FileRecord>),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
) -> Result<impl IntoResponse, HttpVaultError> {
    let records = state.files.list(owner.owner_id).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/v0/files/{id}/chunks",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Persisted chunks in order", body = Vec<ChunkInfo>),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_file_chunks(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpVaultError> {
    let chunks = state.files.get_chunks(id, owner.owner_id).await?;
    Ok(Json(chunks))
}
