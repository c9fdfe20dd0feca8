//! File record persistence
//!
//! The trait is the seam a SQL-backed implementation would fill; the shipped
//! backend is in-memory. Status transitions are compare-and-set so racing
//! consumers can never double-complete a record or downgrade a terminal state.

use async_trait::async_trait;
use chrono::Utc;
use chunkvault_core::{FileRecord, FileStatus};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::traits::{StoreError, StoreResult};

#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Insert a new record. A duplicate id is a backend error.
    async fn create(&self, record: FileRecord) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<FileRecord>>;

    /// Lookup scoped to an owner. An ownership mismatch reads as absent so
    /// existence never leaks across owners.
    async fn get_owned(&self, id: Uuid, owner_id: Uuid) -> StoreResult<Option<FileRecord>>;

    /// All records for an owner, newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<FileRecord>>;

    /// Patch metadata fields; absent fields are left unchanged. Bumps
    /// `updated_at`. Returns the updated record, or None if the id is unknown.
    async fn update_metadata(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        content_type: Option<String>,
    ) -> StoreResult<Option<FileRecord>>;

    /// Return the record to Pending with a new declared size and expected
    /// chunk count, clearing any error detail. Used only as the first step of
    /// content replacement; this is the single legitimate way out of a
    /// terminal state.
    async fn reset_for_reingest(
        &self,
        id: Uuid,
        size_bytes: u64,
        chunk_count: u32,
    ) -> StoreResult<Option<FileRecord>>;

    /// Transition Pending -> Completed. Returns false (and changes nothing)
    /// when the record is missing or already terminal.
    async fn complete_if_pending(&self, id: Uuid) -> StoreResult<bool>;

    /// Transition Pending -> Error with the captured detail. Returns false
    /// (and changes nothing) when the record is missing or already terminal.
    async fn fail_if_pending(&self, id: Uuid, detail: &str) -> StoreResult<bool>;

    /// Remove the record. Returns false if the id was unknown.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// In-memory record store.
#[derive(Clone, Default)]
pub struct MemoryFileRecordStore {
    records: Arc<RwLock<HashMap<Uuid, FileRecord>>>,
}

impl MemoryFileRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRecordStore for MemoryFileRecordStore {
    async fn create(&self, record: FileRecord) -> StoreResult<()> {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&record.id) {
            return Err(StoreError::BackendError(format!(
                "Record {} already exists",
                record.id
            )));
        }
        guard.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<FileRecord>> {
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(&id).cloned())
    }

    async fn get_owned(&self, id: Uuid, owner_id: Uuid) -> StoreResult<Option<FileRecord>> {
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .get(&id)
            .filter(|record| record.owner_id == owner_id)
            .cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<FileRecord>> {
        let guard = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<FileRecord> = guard
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        content_type: Option<String>,
    ) -> StoreResult<Option<FileRecord>> {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(record) = guard.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            record.name = name;
        }
        if let Some(description) = description {
            record.description = Some(description);
        }
        if let Some(content_type) = content_type {
            record.content_type = content_type;
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn reset_for_reingest(
        &self,
        id: Uuid,
        size_bytes: u64,
        chunk_count: u32,
    ) -> StoreResult<Option<FileRecord>> {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(record) = guard.get_mut(&id) else {
            return Ok(None);
        };
        record.status = FileStatus::Pending;
        record.error_detail = None;
        record.size_bytes = size_bytes;
        record.chunk_count = chunk_count;
        // New content generation: in-flight messages split from the old
        // content no longer match and get dropped by the consumer.
        record.generation += 1;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn complete_if_pending(&self, id: Uuid) -> StoreResult<bool> {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.get_mut(&id) {
            Some(record) if record.status == FileStatus::Pending => {
                record.status = FileStatus::Completed;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_if_pending(&self, id: Uuid, detail: &str) -> StoreResult<bool> {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.get_mut(&id) {
            Some(record) if record.status == FileStatus::Pending => {
                record.status = FileStatus::Error;
                record.error_detail = Some(detail.to_string());
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(guard.remove(&id).is_some())
    }
}
