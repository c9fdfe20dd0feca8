//! Shared test harness: an in-memory application behind an axum-test server
//! with two configured API keys.

use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chunkvault_core::{
    ApiKeyEntry, BaseConfig, Config, FileRecord, FileStatus, StorageBackend, VaultConfig,
};
use uuid::Uuid;

pub const OWNER_ONE_KEY: &str = "cv_test_owner_one";
pub const OWNER_TWO_KEY: &str = "cv_test_owner_two";

/// Small chunks so multi-chunk files stay tiny in tests.
pub const TEST_CHUNK_SIZE: usize = 16;
pub const TEST_MAX_FILE_SIZE: usize = 64;

// base64 of 32 ASCII digits
const TEST_ENCRYPTION_KEY: &str = "MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=";

pub struct TestApp {
    pub server: TestServer,
    pub owner_one: Uuid,
    pub owner_two: Uuid,
}

fn test_config(owner_one: Uuid, owner_two: Uuid) -> Config {
    Config(Box::new(VaultConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
        },
        encryption_key: TEST_ENCRYPTION_KEY.to_string(),
        chunk_size_bytes: TEST_CHUNK_SIZE,
        max_file_size_bytes: TEST_MAX_FILE_SIZE,
        storage_backend: StorageBackend::Memory,
        storage_path: None,
        ingest_queue_capacity: 64,
        ingest_max_workers: 4,
        ingest_max_delivery_attempts: 3,
        api_keys: vec![
            ApiKeyEntry {
                key: OWNER_ONE_KEY.to_string(),
                owner_id: owner_one,
            },
            ApiKeyEntry {
                key: OWNER_TWO_KEY.to_string(),
                owner_id: owner_two,
            },
        ],
    }))
}

pub async fn spawn_app() -> TestApp {
    let owner_one = Uuid::new_v4();
    let owner_two = Uuid::new_v4();

    let (_state, router) = chunkvault_api::setup::build_app(test_config(owner_one, owner_two))
        .await
        .expect("failed to build app");

    TestApp {
        server: TestServer::new(router).expect("failed to start test server"),
        owner_one,
        owner_two,
    }
}

/// Multipart form with a single file part plus optional name override.
pub fn upload_form(filename: &str, content_type: &str, data: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data.to_vec())
            .file_name(filename)
            .mime_type(content_type),
    )
}

impl TestApp {
    /// Upload synchronously as owner one and return the created record.
    pub async fn upload_sync(&self, filename: &str, data: &[u8]) -> FileRecord {
        let response = self
            .server
            .post("/api/v0/files")
            .add_query_param("mode", "sync")
            .add_header("x-api-key", OWNER_ONE_KEY)
            .multipart(upload_form(filename, "application/octet-stream", data))
            .await;
        response.assert_status(http::StatusCode::CREATED);
        response.json::<FileRecord>()
    }

    /// Poll a record until it reaches the expected status.
    pub async fn wait_for_status(&self, api_key: &str, id: Uuid, expected: FileStatus) -> FileRecord {
        for _ in 0..200 {
            let record = self
                .server
                .get(&format!("/api/v0/files/{}", id))
                .add_header("x-api-key", api_key)
                .await
                .json::<FileRecord>();
            if record.status == expected {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("file {} never reached status {}", id, expected);
    }
}
