use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpVaultError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    delete,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpVaultError> {
    state.files.delete(id, owner.owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
