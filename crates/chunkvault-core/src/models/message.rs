use bytes::Bytes;
use uuid::Uuid;

/// One plaintext chunk in flight between producer and consumers. The queue
/// and the consumer's processing window are the only places plaintext chunk
/// bytes exist outside the originating request.
#[derive(Debug, Clone)]
pub struct ChunkMessage {
    pub file_id: Uuid,
    /// Zero-based position of the chunk within the file
    pub order: u32,
    /// Content generation of the record at split time. Consumers drop the
    /// message when the record has since moved to a newer generation.
    pub generation: u64,
    pub data: Bytes,
}

impl ChunkMessage {
    pub fn new(file_id: Uuid, order: u32, generation: u64, data: Bytes) -> Self {
        Self {
            file_id,
            order,
            generation,
            data,
        }
    }
}
