//! Chunkvault Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration, and
//! the two chunk primitives (splitting and encryption) shared across all
//! chunkvault components.

pub mod codec;
pub mod config;
pub mod error;
pub mod ingest_error;
pub mod models;
pub mod splitter;

// Re-export commonly used types
pub use codec::ChunkCipher;
pub use config::{ApiKeyEntry, BaseConfig, Config, StorageBackend, VaultConfig};
pub use error::{ErrorMetadata, LogLevel, VaultError};
pub use ingest_error::{IngestError, IngestResultExt};
pub use models::{ChunkInfo, ChunkMessage, FileMetadata, FileRecord, FileStatus, UpdateFileMetadata};
