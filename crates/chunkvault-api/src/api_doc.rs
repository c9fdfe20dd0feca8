//! OpenAPI documentation.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;

struct ApiKeySecurity;

impl Modify for ApiKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chunkvault API",
        version = "0.1.0",
        description = "Encrypted chunked blob store (v0). Files are split into fixed-size chunks, encrypted with AES-256-GCM, and ingested synchronously or through an asynchronous pipeline with status polling. All file endpoints are versioned under /api/v0/ and authenticated with an X-Api-Key header."
    ),
    paths(
        handlers::upload::upload_file,
        handlers::files::get_file,
        handlers::files::list_files,
        handlers::files::get_file_chunks,
        handlers::download::download_file,
        handlers::update::update_file,
        handlers::delete::delete_file,
        handlers::health::health_check,
    ),
    components(
        schemas(
            chunkvault_core::FileRecord,
            chunkvault_core::FileStatus,
            chunkvault_core::FileMetadata,
            chunkvault_core::UpdateFileMetadata,
            chunkvault_core::ChunkInfo,
            handlers::upload::UploadForm,
            handlers::health::HealthCheckResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&ApiKeySecurity),
    tags(
        (name = "files", description = "Chunked, encrypted file storage"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Returns the OpenAPI spec served at /api/openapi.json.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
