//! Chunkvault Storage Library
//!
//! Persistence for the chunk store and the file record store. Chunks are
//! stored as opaque ciphertext keyed by (file_id, order); records hold the
//! metadata and ingestion lifecycle of each file.

pub mod local;
pub mod memory;
pub mod records;
pub mod traits;

pub use local::LocalChunkStore;
pub use memory::MemoryChunkStore;
pub use records::{FileRecordStore, MemoryFileRecordStore};
pub use traits::{ChunkStore, StoreError, StoreResult};
