//! Consumer pool: encrypts and persists queued chunks, driving the record
//! status lifecycle.
//!
//! Shutdown: [`ConsumerPool::shutdown`] signals the dispatcher to stop; it
//! does not wait for in-flight chunks. Graceful shutdown is coordinated by
//! the server runtime.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use chunkvault_core::{ChunkCipher, ChunkMessage, IngestError, IngestResultExt, VaultError};
use chunkvault_store::{ChunkStore, FileRecordStore};

use crate::queue::{Envelope, IngestionQueue};

#[derive(Clone)]
pub struct ConsumerPoolConfig {
    /// Maximum chunks processed concurrently.
    pub max_workers: usize,
    /// Total deliveries per message before the file is failed. Redelivery by
    /// the queue provides retry; the consumer itself never loops.
    pub max_delivery_attempts: u32,
}

impl Default for ConsumerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_delivery_attempts: 3,
        }
    }
}

/// Worker pool over the ingestion queue. A dispatcher task owns the receiver;
/// each message is processed in a spawned task holding a semaphore permit, so
/// consumers for different chunks of the same file run in parallel without
/// coordination beyond the keyed idempotent put.
pub struct ConsumerPool {
    shutdown_tx: mpsc::Sender<()>,
}

impl ConsumerPool {
    pub fn new(
        config: ConsumerPoolConfig,
        rx: mpsc::Receiver<Envelope>,
        queue: IngestionQueue,
        chunks: Arc<dyn ChunkStore>,
        records: Arc<dyn FileRecordStore>,
        cipher: ChunkCipher,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::dispatch_loop(config, rx, queue, chunks, records, cipher, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    /// Signals the dispatcher to stop pulling messages. Returns immediately;
    /// already-spawned chunk handlers run to completion.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating consumer pool shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn dispatch_loop(
        config: ConsumerPoolConfig,
        mut rx: mpsc::Receiver<Envelope>,
        queue: IngestionQueue,
        chunks: Arc<dyn ChunkStore>,
        records: Arc<dyn FileRecordStore>,
        cipher: ChunkCipher,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            max_delivery_attempts = config.max_delivery_attempts,
            "Consumer pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Consumer pool shutting down");
                    break;
                }
                maybe_envelope = rx.recv() => {
                    let Some(envelope) = maybe_envelope else {
                        tracing::info!("Ingestion queue closed, consumer pool stopping");
                        break;
                    };
                    let Ok(permit) = semaphore.clone().acquire_owned().await else {
                        break;
                    };

                    let queue = queue.clone();
                    let chunks = chunks.clone();
                    let records = records.clone();
                    let cipher = cipher.clone();
                    let max_attempts = config.max_delivery_attempts;
                    tokio::spawn(async move {
                        let _permit = permit;
                        handle_envelope(envelope, queue, chunks, records, cipher, max_attempts)
                            .await;
                    });
                }
            }
        }

        tracing::info!("Consumer pool stopped");
    }
}

#[tracing::instrument(
    skip(envelope, queue, chunks, records, cipher),
    fields(
        file_id = %envelope.message.file_id,
        order = envelope.message.order,
        generation = envelope.message.generation,
        attempt = envelope.attempt,
    )
)]
async fn handle_envelope(
    envelope: Envelope,
    queue: IngestionQueue,
    chunks: Arc<dyn ChunkStore>,
    records: Arc<dyn FileRecordStore>,
    cipher: ChunkCipher,
    max_attempts: u32,
) {
    let file_id = envelope.message.file_id;

    match process_message(&envelope.message, &*chunks, &*records, &cipher).await {
        Ok(()) => {}
        Err(err) => {
            tracing::error!(
                error = %err,
                recoverable = err.is_recoverable(),
                "Chunk processing failed"
            );

            if err.is_recoverable() && envelope.attempt < max_attempts {
                if let Err(redeliver_err) = queue.redeliver(envelope).await {
                    tracing::warn!(error = %redeliver_err, "Redelivery failed, failing record");
                    fail_record(&*records, file_id, &err.detail()).await;
                }
            } else {
                fail_record(&*records, file_id, &err.detail()).await;
            }
        }
    }
}

/// Process one delivered chunk: re-check the record still exists, encrypt,
/// persist, and complete the record once all expected chunks are confirmed.
async fn process_message(
    message: &ChunkMessage,
    chunks: &dyn ChunkStore,
    records: &dyn FileRecordStore,
    cipher: &ChunkCipher,
) -> Result<(), IngestError> {
    // Deletion may race ingestion. A missing record means the file was
    // deleted after its chunks were queued: drop the message rather than
    // resurrect anything.
    let record = records
        .get(message.file_id)
        .await
        .map_err(VaultError::from)
        .recoverable()?;
    let Some(record) = record else {
        tracing::debug!("Record gone, dropping chunk message");
        return Ok(());
    };
    // Content replacement bumps the record's generation; a message split from
    // superseded content must not overwrite the current chunks.
    if record.generation != message.generation {
        tracing::debug!(
            record_generation = record.generation,
            "Stale generation, dropping chunk message"
        );
        return Ok(());
    }

    let ciphertext = cipher.encrypt(&message.data).map_err(IngestError::from)?;

    chunks
        .put(message.file_id, message.order, ciphertext.into())
        .await
        .map_err(VaultError::from)
        .recoverable()?;

    let persisted = chunks
        .count(message.file_id)
        .await
        .map_err(VaultError::from)
        .recoverable()?;

    if persisted >= record.chunk_count {
        // CAS: a racing consumer may have completed the record first, or the
        // record may already be failed. Losing is benign either way.
        let completed = records
            .complete_if_pending(message.file_id)
            .await
            .map_err(VaultError::from)
            .recoverable()?;
        if completed {
            tracing::info!(chunk_count = record.chunk_count, "File ingestion completed");
        } else {
            tracing::debug!("Completion CAS lost, record already terminal");
        }
    }

    Ok(())
}

async fn fail_record(records: &dyn FileRecordStore, file_id: uuid::Uuid, detail: &str) {
    match records.fail_if_pending(file_id, detail).await {
        Ok(true) => {
            tracing::error!(file_id = %file_id, detail = %detail, "File ingestion failed");
        }
        Ok(false) => {
            tracing::debug!(file_id = %file_id, "Failure CAS lost, record missing or terminal");
        }
        Err(e) => {
            tracing::error!(file_id = %file_id, error = %e, "Could not mark record as failed");
        }
    }
}
