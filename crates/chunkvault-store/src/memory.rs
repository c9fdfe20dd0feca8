use crate::traits::{ChunkStore, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// In-memory chunk store. Used by tests and for ephemeral deployments.
///
/// The per-file BTreeMap keyed by order gives ordered, deduplicated retrieval
/// by construction; a HashMap insert is the idempotent upsert.
#[derive(Clone, Default)]
pub struct MemoryChunkStore {
    chunks: Arc<RwLock<HashMap<Uuid, BTreeMap<u32, Bytes>>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn put(&self, file_id: Uuid, order: u32, ciphertext: Bytes) -> StoreResult<()> {
        let mut guard = self
            .chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.entry(file_id).or_default().insert(order, ciphertext);
        Ok(())
    }

    async fn get_ordered(&self, file_id: Uuid) -> StoreResult<Vec<(u32, Bytes)>> {
        let guard = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .get(&file_id)
            .map(|chunks| chunks.iter().map(|(k, v)| (*k, v.clone())).collect())
            .unwrap_or_default())
    }

    async fn count(&self, file_id: Uuid) -> StoreResult<u32> {
        let guard = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(&file_id).map(|chunks| chunks.len() as u32).unwrap_or(0))
    }

    async fn delete_all(&self, file_id: Uuid) -> StoreResult<()> {
        let mut guard = self
            .chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.remove(&file_id);
        Ok(())
    }
}
