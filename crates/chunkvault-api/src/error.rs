//! HTTP error response conversion
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse,
//! HttpVaultError>`. Use `VaultError` (or types that implement
//! `Into<VaultError>`) for errors so they render consistently (status, body,
//! logging).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chunkvault_core::{ErrorMetadata, LogLevel, VaultError};
use chunkvault_store::StoreError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for VaultError to implement IntoResponse. Necessary because
/// of Rust's orphan rules: IntoResponse is an external trait and VaultError
/// lives in chunkvault-core.
#[derive(Debug)]
pub struct HttpVaultError(pub VaultError);

impl From<VaultError> for HttpVaultError {
    fn from(err: VaultError) -> Self {
        HttpVaultError(err)
    }
}

impl From<anyhow::Error> for HttpVaultError {
    fn from(err: anyhow::Error) -> Self {
        HttpVaultError(VaultError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StoreError> for HttpVaultError {
    fn from(err: StoreError) -> Self {
        HttpVaultError(err.into())
    }
}

fn log_error(error: &VaultError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpVaultError {
    fn into_response(self) -> Response {
        let vault_error = &self.0;
        let is_production = is_production_env();

        let status = StatusCode::from_u16(vault_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(vault_error);

        // Always hide details in production; in non-production, only show
        // details for non-sensitive errors.
        let body = if is_production || vault_error.is_sensitive() {
            Json(ErrorResponse {
                error: vault_error.client_message(),
                details: None,
                error_type: None,
                code: vault_error.error_code().to_string(),
                recoverable: vault_error.is_recoverable(),
                suggested_action: vault_error.suggested_action().map(String::from),
            })
        } else {
            Json(ErrorResponse {
                error: vault_error.client_message(),
                details: Some(vault_error.detailed_message()),
                error_type: Some(vault_error.error_type().to_string()),
                code: vault_error.error_code().to_string(),
                recoverable: vault_error.is_recoverable(),
                suggested_action: vault_error.suggested_action().map(String::from),
            })
        };

        (status, body).into_response()
    }
}
