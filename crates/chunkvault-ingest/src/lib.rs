//! Chunkvault Ingestion Library
//!
//! The asynchronous ingestion pipeline: a bounded in-process queue of
//! plaintext chunk messages, a consumer pool that encrypts and persists them,
//! and the FileService that fronts both ingestion modes and retrieval.

pub mod consumer;
pub mod queue;
pub mod service;

pub use consumer::{ConsumerPool, ConsumerPoolConfig};
pub use queue::{Envelope, IngestionQueue};
pub use service::{FileService, ReplacementContent};
