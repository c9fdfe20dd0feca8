use crate::traits::{ChunkStore, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const CHUNK_EXTENSION: &str = "chunk";

/// Local filesystem chunk store.
///
/// Layout: `{base_path}/{file_id}/{order:08}.chunk`. Writes go to a uniquely
/// named temp file in the same directory and are renamed into place, so a put
/// is atomic from any concurrent reader's perspective and a retry with the
/// same key simply replaces the file with identical bytes.
#[derive(Clone)]
pub struct LocalChunkStore {
    base_path: PathBuf,
}

impl LocalChunkStore {
    /// Create a new LocalChunkStore rooted at `base_path`, creating the
    /// directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StoreError::ConfigError(format!(
                "Failed to create chunk storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalChunkStore { base_path })
    }

    fn file_dir(&self, file_id: Uuid) -> PathBuf {
        // Uuid's Display is hyphenated hex, so the path cannot escape base_path.
        self.base_path.join(file_id.to_string())
    }

    fn chunk_path(&self, file_id: Uuid, order: u32) -> PathBuf {
        self.file_dir(file_id)
            .join(format!("{:08}.{}", order, CHUNK_EXTENSION))
    }

    /// Parse a chunk filename back into its order. Files that do not match
    /// the `{order:08}.chunk` shape (e.g. leftover temp files) are skipped.
    fn parse_order(filename: &str) -> Option<u32> {
        let stem = filename.strip_suffix(&format!(".{}", CHUNK_EXTENSION))?;
        if stem.len() != 8 {
            return None;
        }
        stem.parse().ok()
    }
}

#[async_trait]
impl ChunkStore for LocalChunkStore {
    async fn put(&self, file_id: Uuid, order: u32, ciphertext: Bytes) -> StoreResult<()> {
        let dir = self.file_dir(file_id);
        let path = self.chunk_path(file_id, order);
        let size = ciphertext.len();
        let start = std::time::Instant::now();

        fs::create_dir_all(&dir).await.map_err(|e| {
            StoreError::UploadFailed(format!(
                "Failed to create chunk directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        // Unique temp name per writer so two consumers redelivering the same
        // chunk never trample each other's partial write.
        let tmp_path = dir.join(format!("{:08}.tmp-{}", order, Uuid::new_v4()));

        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StoreError::UploadFailed(format!(
                "Failed to create temp file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        if let Err(e) = file.write_all(&ciphertext).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::UploadFailed(format!(
                "Failed to write temp file {}: {}",
                tmp_path.display(),
                e
            )));
        }

        if let Err(e) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::UploadFailed(format!(
                "Failed to sync temp file {}: {}",
                tmp_path.display(),
                e
            )));
        }

        fs::rename(&tmp_path, &path).await.map_err(|e| {
            StoreError::UploadFailed(format!(
                "Failed to move chunk into place {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(
            file_id = %file_id,
            order = order,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Chunk written"
        );

        Ok(())
    }

    async fn get_ordered(&self, file_id: Uuid) -> StoreResult<Vec<(u32, Bytes)>> {
        let dir = self.file_dir(file_id);
        let start = std::time::Instant::now();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::DownloadFailed(format!(
                    "Failed to read chunk directory {}: {}",
                    dir.display(),
                    e
                )))
            }
        };

        // BTreeMap gives ascending order and deduplicates by construction.
        let mut chunks = BTreeMap::new();
        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            let Some(order) = filename.to_str().and_then(Self::parse_order) else {
                continue;
            };
            let data = fs::read(entry.path()).await.map_err(|e| {
                StoreError::DownloadFailed(format!(
                    "Failed to read chunk {}: {}",
                    entry.path().display(),
                    e
                ))
            })?;
            chunks.insert(order, Bytes::from(data));
        }

        let total_bytes: usize = chunks.values().map(|c| c.len()).sum();
        tracing::debug!(
            file_id = %file_id,
            chunks = chunks.len(),
            size_bytes = total_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Chunks read"
        );

        Ok(chunks.into_iter().collect())
    }

    async fn count(&self, file_id: Uuid) -> StoreResult<u32> {
        let dir = self.file_dir(file_id);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StoreError::BackendError(format!(
                    "Failed to read chunk directory {}: {}",
                    dir.display(),
                    e
                )))
            }
        };

        let mut count = 0u32;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_str()
                .and_then(Self::parse_order)
                .is_some()
            {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn delete_all(&self, file_id: Uuid) -> StoreResult<()> {
        let dir = self.file_dir(file_id);
        let start = std::time::Instant::now();

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(
                    file_id = %file_id,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Chunks deleted"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::DeleteFailed(format!(
                "Failed to delete chunk directory {}: {}",
                dir.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_and_get_ordered() {
        let dir = tempdir().unwrap();
        let store = LocalChunkStore::new(dir.path()).await.unwrap();
        let file_id = Uuid::new_v4();

        store
            .put(file_id, 1, Bytes::from_static(b"second"))
            .await
            .unwrap();
        store
            .put(file_id, 0, Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .put(file_id, 2, Bytes::from_static(b"third"))
            .await
            .unwrap();

        let chunks = store.get_ordered(file_id).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], (0, Bytes::from_static(b"first")));
        assert_eq!(chunks[1], (1, Bytes::from_static(b"second")));
        assert_eq!(chunks[2], (2, Bytes::from_static(b"third")));
        assert_eq!(store.count(file_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalChunkStore::new(dir.path()).await.unwrap();
        let file_id = Uuid::new_v4();

        store
            .put(file_id, 0, Bytes::from_static(b"payload"))
            .await
            .unwrap();
        store
            .put(file_id, 0, Bytes::from_static(b"payload"))
            .await
            .unwrap();

        let chunks = store.get_ordered(file_id).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].1, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn test_get_ordered_empty_for_unknown_file() {
        let dir = tempdir().unwrap();
        let store = LocalChunkStore::new(dir.path()).await.unwrap();

        let chunks = store.get_ordered(Uuid::new_v4()).await.unwrap();
        assert!(chunks.is_empty());
        assert_eq!(store.count(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let dir = tempdir().unwrap();
        let store = LocalChunkStore::new(dir.path()).await.unwrap();
        let file_id = Uuid::new_v4();

        store.put(file_id, 0, Bytes::from_static(b"a")).await.unwrap();
        store.put(file_id, 1, Bytes::from_static(b"b")).await.unwrap();

        store.delete_all(file_id).await.unwrap();
        assert!(store.get_ordered(file_id).await.unwrap().is_empty());

        // Deleting again is not an error
        store.delete_all(file_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_files_are_isolated() {
        let dir = tempdir().unwrap();
        let store = LocalChunkStore::new(dir.path()).await.unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.put(a, 0, Bytes::from_static(b"a0")).await.unwrap();
        store.put(b, 0, Bytes::from_static(b"b0")).await.unwrap();

        store.delete_all(a).await.unwrap();
        assert!(store.get_ordered(a).await.unwrap().is_empty());
        assert_eq!(store.get_ordered(b).await.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_order_skips_foreign_files() {
        assert_eq!(LocalChunkStore::parse_order("00000003.chunk"), Some(3));
        assert_eq!(LocalChunkStore::parse_order("00000003.tmp-abc"), None);
        assert_eq!(LocalChunkStore::parse_order("3.chunk"), None);
        assert_eq!(LocalChunkStore::parse_order("notanumber.chunk"), None);
    }
}
