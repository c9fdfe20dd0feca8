//! Application state shared across handlers.

use std::sync::Arc;

use chunkvault_core::Config;
use chunkvault_ingest::{ConsumerPool, FileService};
use chunkvault_store::ChunkStore;

/// Main application state. Handlers extract it as `State<Arc<AppState>>`;
/// all collaborators are wired explicitly in [`crate::setup::build_app`].
pub struct AppState {
    pub files: FileService,
    /// Direct handle to the chunk backend, used by the health check.
    pub chunks: Arc<dyn ChunkStore>,
    pub config: Config,
    /// Keeps the consumer pool alive for the process lifetime and exposes
    /// shutdown to the server runtime.
    pub consumers: ConsumerPool,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
