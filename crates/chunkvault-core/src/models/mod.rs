pub mod file;
pub mod message;

pub use file::{ChunkInfo, FileMetadata, FileRecord, FileStatus, UpdateFileMetadata};
pub use message::ChunkMessage;
