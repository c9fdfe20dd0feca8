//! Ingestion queue: bounded in-process channel with at-least-once delivery.
//!
//! A single producer task enqueues a file's chunks in ascending order, so
//! same-file messages arrive in non-decreasing order while the process lives.
//! Consumers must not rely on that anyway: chunk writes are keyed by order,
//! so out-of-order and duplicate arrivals are safe.

use chunkvault_core::{ChunkMessage, VaultError};
use tokio::sync::mpsc;

/// One queued message plus its delivery attempt counter. Redelivery bumps the
/// counter; the consumer stops redelivering past the configured maximum.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: ChunkMessage,
    pub attempt: u32,
}

impl Envelope {
    pub fn new(message: ChunkMessage) -> Self {
        Self {
            message,
            attempt: 1,
        }
    }
}

/// Producer-side handle to the ingestion channel. Cheap to clone.
#[derive(Clone)]
pub struct IngestionQueue {
    tx: mpsc::Sender<Envelope>,
}

impl IngestionQueue {
    /// Create the queue and the receiver end for the consumer pool.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue a first-delivery message. Awaits channel capacity, which gives
    /// the producer backpressure instead of unbounded buffering.
    pub async fn publish(&self, message: ChunkMessage) -> Result<(), VaultError> {
        let file_id = message.file_id;
        let order = message.order;
        self.tx
            .send(Envelope::new(message))
            .await
            .map_err(|_| VaultError::Internal("Ingestion queue is closed".to_string()))?;
        tracing::debug!(file_id = %file_id, order = order, "Chunk message published");
        Ok(())
    }

    /// Re-enqueue a message after a recoverable failure, bumping the attempt
    /// counter. At-least-once: the message may now be seen more than once.
    pub async fn redeliver(&self, envelope: Envelope) -> Result<(), VaultError> {
        let attempt = envelope.attempt + 1;
        tracing::debug!(
            file_id = %envelope.message.file_id,
            order = envelope.message.order,
            attempt = attempt,
            "Chunk message redelivered"
        );
        self.tx
            .send(Envelope {
                attempt,
                ..envelope
            })
            .await
            .map_err(|_| VaultError::Internal("Ingestion queue is closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_preserves_order() {
        let (queue, mut rx) = IngestionQueue::channel(8);
        let file_id = Uuid::new_v4();

        for order in 0..3 {
            queue
                .publish(ChunkMessage::new(file_id, order, 0, Bytes::from_static(b"x")))
                .await
                .unwrap();
        }

        for expected in 0..3 {
            let envelope = rx.recv().await.unwrap();
            assert_eq!(envelope.message.order, expected);
            assert_eq!(envelope.attempt, 1);
        }
    }

    #[tokio::test]
    async fn test_redeliver_bumps_attempt() {
        let (queue, mut rx) = IngestionQueue::channel(8);
        let message = ChunkMessage::new(Uuid::new_v4(), 0, 0, Bytes::from_static(b"x"));

        queue.publish(message).await.unwrap();
        let envelope = rx.recv().await.unwrap();
        queue.redeliver(envelope).await.unwrap();

        let redelivered = rx.recv().await.unwrap();
        assert_eq!(redelivered.attempt, 2);
    }

    #[tokio::test]
    async fn test_publish_to_closed_queue_errors() {
        let (queue, rx) = IngestionQueue::channel(1);
        drop(rx);

        let result = queue
            .publish(ChunkMessage::new(Uuid::new_v4(), 0, 0, Bytes::from_static(b"x")))
            .await;
        assert!(matches!(result, Err(VaultError::Internal(_))));
    }
}
