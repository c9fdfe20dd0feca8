//! Chunk store abstraction trait
//!
//! This module defines the ChunkStore trait that all chunk backends must
//! implement, and the error type shared by the storage layer.

use async_trait::async_trait;
use bytes::Bytes;
use chunkvault_core::VaultError;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => VaultError::NotFound(msg),
            StoreError::InvalidKey(msg) => VaultError::InvalidInput(msg),
            other => VaultError::Storage(other.to_string()),
        }
    }
}

/// Chunk persistence abstraction
///
/// All chunk backends (local filesystem, in-memory) must implement this trait.
/// Chunks are keyed by (file_id, order) and hold ciphertext only; the store
/// never sees plaintext.
///
/// `put` is an idempotent upsert: redelivery of the same chunk must not create
/// a duplicate, and a single put is atomic from any concurrent reader's
/// perspective.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Upsert the ciphertext for one chunk, keyed by (file_id, order).
    async fn put(&self, file_id: Uuid, order: u32, ciphertext: Bytes) -> StoreResult<()>;

    /// All chunks for a file, ascending by order with no duplicates.
    /// Returns an empty Vec (not an error) when the file has no chunks yet.
    async fn get_ordered(&self, file_id: Uuid) -> StoreResult<Vec<(u32, Bytes)>>;

    /// Number of distinct orders persisted for a file. Drives the
    /// completion check during ingestion.
    async fn count(&self, file_id: Uuid) -> StoreResult<u32>;

    /// Remove every chunk for a file. Ok when none exist.
    async fn delete_all(&self, file_id: Uuid) -> StoreResult<()>;
}
