//! Error types module
//!
//! This module provides the core error types used throughout the chunkvault
//! application. All errors are unified under the `VaultError` enum which can
//! represent validation, lookup, crypto, ingestion, and storage failures.

use std::io;

use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like incomplete ingestion
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("File {file_id} is not fully ingested: {actual}/{expected} chunks")]
    IncompleteIngestion {
        file_id: Uuid,
        expected: u32,
        actual: u32,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for VaultError {
    fn from(err: anyhow::Error) -> Self {
        VaultError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for VaultError {
    fn from(err: io::Error) -> Self {
        VaultError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for VaultError {
    fn from(err: uuid::Error) -> Self {
        VaultError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for VaultError {
    fn from(err: validator::ValidationErrors) -> Self {
        VaultError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn vault_error_static_metadata(
    err: &VaultError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        VaultError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        VaultError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file ID exists"),
            false,
            LogLevel::Debug,
        ),
        VaultError::Crypto(_) => (
            500,
            "CRYPTO_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        VaultError::IncompleteIngestion { .. } => (
            409,
            "INCOMPLETE_INGESTION",
            true,
            Some("Wait for ingestion to finish and retry"),
            false,
            LogLevel::Debug,
        ),
        VaultError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        VaultError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size and try again"),
            false,
            LogLevel::Debug,
        ),
        VaultError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check API key"),
            false,
            LogLevel::Debug,
        ),
        VaultError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        VaultError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl VaultError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            VaultError::InvalidInput(_) => "InvalidInput",
            VaultError::NotFound(_) => "NotFound",
            VaultError::Crypto(_) => "Crypto",
            VaultError::IncompleteIngestion { .. } => "IncompleteIngestion",
            VaultError::Storage(_) => "Storage",
            VaultError::PayloadTooLarge(_) => "PayloadTooLarge",
            VaultError::Unauthorized(_) => "Unauthorized",
            VaultError::Internal(_) => "Internal",
            VaultError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for VaultError {
    fn http_status_code(&self) -> u16 {
        vault_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        vault_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        vault_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        vault_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        vault_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        vault_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            VaultError::InvalidInput(ref msg) => msg.clone(),
            VaultError::NotFound(ref msg) => msg.clone(),
            VaultError::Crypto(_) => "Encryption operation failed".to_string(),
            VaultError::IncompleteIngestion {
                file_id,
                expected,
                actual,
            } => {
                format!(
                    "File {} is not fully ingested: {}/{} chunks",
                    file_id, actual, expected
                )
            }
            VaultError::Storage(_) => "Failed to access storage".to_string(),
            VaultError::PayloadTooLarge(ref msg) => msg.clone(),
            VaultError::Unauthorized(ref msg) => msg.clone(),
            VaultError::Internal(_) => "Internal server error".to_string(),
            VaultError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
