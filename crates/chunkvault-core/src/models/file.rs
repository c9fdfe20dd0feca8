use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Ingestion lifecycle of a file. Transitions are Pending -> Completed or
/// Pending -> Error only; terminal states never revert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Completed,
    Error,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStatus::Pending => write!(f, "pending"),
            FileStatus::Completed => write!(f, "completed"),
            FileStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FileStatus::Pending),
            "completed" => Ok(FileStatus::Completed),
            "error" => Ok(FileStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid file status: {}", s)),
        }
    }
}

/// Metadata and lifecycle status for one logical file. The chunk set for a
/// record is owned exclusively by that record and keyed by (id, order).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub content_type: String,
    /// Declared size in bytes; equals the original byte length once ingested.
    pub size_bytes: u64,
    /// Expected number of chunks, fixed at creation from the split. Completion
    /// requires all of them confirmed persisted.
    pub chunk_count: u32,
    /// Content generation, bumped on every content replacement. Chunk
    /// messages carry the generation they were split from; a consumer drops
    /// any message whose generation no longer matches the record, so a stale
    /// queued chunk can never overwrite replaced content.
    pub generation: u64,
    pub status: FileStatus,
    /// Set only when status is `error`.
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Create a pending record. Called by the producer before any chunk is
    /// queued so the status is observable from the first moment.
    pub fn new(
        owner_id: Uuid,
        name: String,
        description: Option<String>,
        content_type: String,
        size_bytes: u64,
        chunk_count: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            description,
            content_type,
            size_bytes,
            chunk_count,
            generation: 0,
            status: FileStatus::Pending,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Upload metadata carried alongside the raw bytes.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct FileMetadata {
    /// Filename used for the attachment disposition on download
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "content type is required"))]
    pub content_type: String,
}

/// Metadata patch for an existing file; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFileMetadata {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Per-chunk ingestion detail surfaced by the chunk listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChunkInfo {
    /// Zero-based position of the chunk within the file
    pub order: u32,
    /// Stored (encrypted) size in bytes
    pub size_bytes: u64,
}
