//! Configuration module
//!
//! Process-wide configuration loaded once at startup: server settings, the
//! chunk encryption key, chunk sizing, storage backend selection, and the
//! ingestion pipeline tuning knobs.

use std::env;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use uuid::Uuid;

/// Where encrypted chunks are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

/// One configured API key and the owner it authenticates as.
#[derive(Debug, Clone)]
pub struct ApiKeyEntry {
    pub key: String,
    pub owner_id: Uuid,
}

/// Base configuration shared by server concerns
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Vault configuration
#[derive(Clone, Debug)]
pub struct VaultConfig {
    pub base: BaseConfig,
    /// Base64-encoded 32-byte AES key; decoded by the codec at startup
    pub encryption_key: String,
    pub chunk_size_bytes: usize,
    pub max_file_size_bytes: usize,
    pub storage_backend: StorageBackend,
    pub storage_path: Option<String>,
    pub ingest_queue_capacity: usize,
    pub ingest_max_workers: usize,
    pub ingest_max_delivery_attempts: u32,
    pub api_keys: Vec<ApiKeyEntry>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<VaultConfig>);

impl Config {
    fn inner(&self) -> &VaultConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = VaultConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn encryption_key(&self) -> &str {
        &self.inner().encryption_key
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.inner().chunk_size_bytes
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn storage_path(&self) -> Option<&str> {
        self.inner().storage_path.as_deref()
    }

    pub fn ingest_queue_capacity(&self) -> usize {
        self.inner().ingest_queue_capacity
    }

    pub fn ingest_max_workers(&self) -> usize {
        self.inner().ingest_max_workers
    }

    pub fn ingest_max_delivery_attempts(&self) -> u32 {
        self.inner().ingest_max_delivery_attempts
    }

    pub fn api_keys(&self) -> &[ApiKeyEntry] {
        &self.inner().api_keys
    }
}

/// Parse the `API_KEYS` value: comma-separated `key:owner-uuid` pairs.
fn parse_api_keys(raw: &str) -> Result<Vec<ApiKeyEntry>, anyhow::Error> {
    let mut entries = Vec::new();
    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, owner) = pair
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("API_KEYS entry '{}' is not key:owner-uuid", pair))?;
        if key.is_empty() {
            return Err(anyhow::anyhow!("API_KEYS contains an empty key"));
        }
        let owner_id = Uuid::parse_str(owner.trim())
            .map_err(|_| anyhow::anyhow!("API_KEYS entry '{}' has an invalid owner UUID", pair))?;
        entries.push(ApiKeyEntry {
            key: key.to_string(),
            owner_id,
        });
    }
    Ok(entries)
}

impl VaultConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const CHUNK_SIZE_BYTES: usize = 1024 * 1024;
        const MAX_FILE_SIZE_MB: usize = 100;
        const INGEST_QUEUE_CAPACITY: usize = 256;
        const INGEST_MAX_WORKERS: usize = 4;
        const INGEST_MAX_DELIVERY_ATTEMPTS: u32 = 3;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
        };

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let config = VaultConfig {
            base,
            encryption_key: env::var("ENCRYPTION_KEY")
                .map_err(|_| anyhow::anyhow!("ENCRYPTION_KEY must be set"))?,
            chunk_size_bytes: env::var("CHUNK_SIZE_BYTES")
                .unwrap_or_else(|_| CHUNK_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(CHUNK_SIZE_BYTES),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            storage_backend,
            storage_path: env::var("STORAGE_PATH").ok().filter(|s| !s.is_empty()),
            ingest_queue_capacity: env::var("INGEST_QUEUE_CAPACITY")
                .unwrap_or_else(|_| INGEST_QUEUE_CAPACITY.to_string())
                .parse()
                .unwrap_or(INGEST_QUEUE_CAPACITY),
            ingest_max_workers: env::var("INGEST_MAX_WORKERS")
                .unwrap_or_else(|_| INGEST_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(INGEST_MAX_WORKERS),
            ingest_max_delivery_attempts: env::var("INGEST_MAX_DELIVERY_ATTEMPTS")
                .unwrap_or_else(|_| INGEST_MAX_DELIVERY_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(INGEST_MAX_DELIVERY_ATTEMPTS),
            api_keys: parse_api_keys(
                &env::var("API_KEYS").map_err(|_| anyhow::anyhow!("API_KEYS must be set"))?,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let is_production = self.base.environment.to_lowercase() == "production"
            || self.base.environment.to_lowercase() == "prod";
        if is_production && self.base.cors_origins.iter().any(|o| o.trim() == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let key_bytes = general_purpose::STANDARD
            .decode(&self.encryption_key)
            .map_err(|_| anyhow::anyhow!("ENCRYPTION_KEY must be valid base64"))?;
        if key_bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "ENCRYPTION_KEY must decode to 32 bytes (256 bits), got {}",
                key_bytes.len()
            ));
        }

        if self.chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("CHUNK_SIZE_BYTES must be greater than zero"));
        }

        if self.max_file_size_bytes < self.chunk_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE_MB must allow at least one full chunk"
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "STORAGE_PATH must be set when using local storage backend"
            ));
        }

        if self.ingest_queue_capacity == 0 {
            return Err(anyhow::anyhow!(
                "INGEST_QUEUE_CAPACITY must be greater than zero"
            ));
        }

        if self.ingest_max_workers == 0 {
            return Err(anyhow::anyhow!(
                "INGEST_MAX_WORKERS must be greater than zero"
            ));
        }

        if self.api_keys.is_empty() {
            return Err(anyhow::anyhow!("API_KEYS must contain at least one entry"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Valid config built directly; avoids env mutation so tests stay parallel-safe.
    fn test_config() -> VaultConfig {
        VaultConfig {
            base: BaseConfig {
                server_port: 4000,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
            },
            // base64 of 32 ASCII digits
            encryption_key: "MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=".to_string(),
            chunk_size_bytes: 1024 * 1024,
            max_file_size_bytes: 100 * 1024 * 1024,
            storage_backend: StorageBackend::Memory,
            storage_path: None,
            ingest_queue_capacity: 256,
            ingest_max_workers: 4,
            ingest_max_delivery_attempts: 3,
            api_keys: vec![ApiKeyEntry {
                key: "cv_test_key".to_string(),
                owner_id: Uuid::new_v4(),
            }],
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_short_encryption_key() {
        let mut config = test_config();
        // base64 of 16 bytes only
        config.encryption_key = "MTIzNDU2Nzg5MDEyMzQ1Ng==".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_base64_encryption_key() {
        let mut config = test_config();
        config.encryption_key = "!!not base64!!".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_wildcard_cors_in_production() {
        let mut config = test_config();
        config.base.environment = "production".to_string();
        assert!(config.validate().is_err());

        config.base.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_backend_requires_storage_path() {
        let mut config = test_config();
        config.storage_backend = StorageBackend::Local;
        assert!(config.validate().is_err());

        config.storage_path = Some("/var/lib/chunkvault".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let mut config = test_config();
        config.chunk_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_file_size_must_cover_one_chunk() {
        let mut config = test_config();
        config.max_file_size_bytes = config.chunk_size_bytes - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!(
            "local".parse::<StorageBackend>().unwrap(),
            StorageBackend::Local
        );
        assert_eq!(
            "MEMORY".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("s3".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_parse_api_keys() {
        let owner = Uuid::new_v4();
        let entries = parse_api_keys(&format!("cv_live_abc:{}", owner)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "cv_live_abc");
        assert_eq!(entries[0].owner_id, owner);

        let two = parse_api_keys(&format!(
            "cv_live_abc:{}, cv_live_def:{}",
            owner,
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(two.len(), 2);

        assert!(parse_api_keys("missing-separator").is_err());
        assert!(parse_api_keys("key:not-a-uuid").is_err());
        assert!(parse_api_keys(&format!(":{}", owner)).is_err());
    }

    #[test]
    fn test_empty_api_keys_rejected() {
        let mut config = test_config();
        config.api_keys.clear();
        assert!(config.validate().is_err());
    }
}
