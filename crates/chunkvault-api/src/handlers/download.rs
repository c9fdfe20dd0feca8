use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpVaultError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use chunkvault_core::VaultError;
use std::sync::Arc;
use uuid::Uuid;

/// Make a stored name safe to embed in a quoted Content-Disposition value.
fn disposition_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == '"' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v0/files/{id}/download",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Reassembled file content", content_type = "application/octet-stream"),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "Ingestion not complete", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, owner), fields(owner_id = %owner.owner_id, file_id = %id))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpVaultError> {
    let (record, plaintext) = state.files.retrieve(id, owner.owner_id).await?;

    tracing::debug!(file_id = %id, size_bytes = plaintext.len(), "Serving reassembled file");

    let content_disposition = format!(
        "attachment; filename=\"{}\"",
        disposition_filename(&record.name)
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.content_type.as_str())
        .header(header::CONTENT_LENGTH, plaintext.len())
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from(plaintext))
        .map_err(|e| VaultError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename_escapes_quotes_and_controls() {
        assert_eq!(disposition_filename("report.pdf"), "report.pdf");
        assert_eq!(disposition_filename("a\"b.txt"), "a_b.txt");
        assert_eq!(disposition_filename("a\\b\n.txt"), "a_b_.txt");
    }
}
