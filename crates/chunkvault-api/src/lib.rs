//! Chunkvault HTTP API
//!
//! Axum surface over the chunk pipeline: multipart upload (sync or async
//! ingestion), status polling, chunk listing, download with attachment
//! disposition, metadata update and content replacement, and deletion.

pub mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod setup;
pub mod state;
pub mod telemetry;
