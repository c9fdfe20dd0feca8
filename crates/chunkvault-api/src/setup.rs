//! Application wiring: stores, pipeline, routes.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

use chunkvault_core::{ChunkCipher, Config, StorageBackend};
use chunkvault_ingest::{ConsumerPool, ConsumerPoolConfig, FileService, IngestionQueue};
use chunkvault_store::{ChunkStore, FileRecordStore, LocalChunkStore, MemoryChunkStore, MemoryFileRecordStore};

use crate::routes;
use crate::state::AppState;

/// Build the chunk store selected by configuration.
async fn setup_chunk_store(config: &Config) -> Result<Arc<dyn ChunkStore>> {
    match config.storage_backend() {
        StorageBackend::Local => {
            let path = config
                .storage_path()
                .ok_or_else(|| anyhow::anyhow!("STORAGE_PATH must be set for local storage"))?;
            tracing::info!(path = %path, "Using local chunk storage");
            Ok(Arc::new(LocalChunkStore::new(path).await?))
        }
        StorageBackend::Memory => {
            tracing::info!("Using in-memory chunk storage");
            Ok(Arc::new(MemoryChunkStore::new()))
        }
    }
}

/// Wire stores, cipher, queue, consumer pool, and the file service into
/// shared application state.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let cipher = ChunkCipher::from_base64_key(config.encryption_key())?;
    let chunks = setup_chunk_store(config).await?;
    let records: Arc<dyn FileRecordStore> = Arc::new(MemoryFileRecordStore::new());

    let (queue, rx) = IngestionQueue::channel(config.ingest_queue_capacity());
    let consumers = ConsumerPool::new(
        ConsumerPoolConfig {
            max_workers: config.ingest_max_workers(),
            max_delivery_attempts: config.ingest_max_delivery_attempts(),
        },
        rx,
        queue.clone(),
        chunks.clone(),
        records.clone(),
        cipher.clone(),
    );

    let files = FileService::new(
        records,
        chunks.clone(),
        cipher,
        queue,
        config.chunk_size_bytes(),
        config.max_file_size_bytes(),
    );

    Ok(Arc::new(AppState {
        files,
        chunks,
        config: config.clone(),
        consumers,
    }))
}

/// Build the full application: validated config in, state plus router out.
pub async fn build_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    config.validate()?;

    let state = build_state(&config).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
