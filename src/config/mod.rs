use crate::services::dispatcher::UploadSettings;
use crate::services::storage::ChunkSettings;
use std::env;

/// Runtime configuration of the unzip service
#[derive(Debug, Clone)]
pub struct UnzipConfig {
    /// Entries larger than this use the chunked transport (default: 100 MB)
    pub put_threshold: u64,

    /// Chunk size of the chunked transport in bytes (default: 4 MB)
    pub chunk_size: usize,

    /// Concurrent chunks per object (default: 1)
    pub chunk_workers: usize,

    /// Lifetime of per-entry upload tokens in seconds (default: 3600)
    pub token_ttl_secs: i64,

    /// HMAC secret for upload tokens (Required)
    pub signing_secret: String,

    /// Charset label tried for non UTF-8 entry names (default: "gbk")
    pub fallback_charset: String,

    /// Object store backend: "s3" or "memory" (default: "s3")
    pub store_backend: String,

    /// S3 compatible endpoint, e.g. a MinIO URL
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// S3 region (default: "us-east-1")
    pub s3_region: String,

    /// HTTP listen address (default: "127.0.0.1:3000")
    pub listen_addr: String,
}

impl Default for UnzipConfig {
    fn default() -> Self {
        Self {
            put_threshold: 100 * 1024 * 1024, // 100 MB
            chunk_size: 4 * 1024 * 1024,      // 4 MB
            chunk_workers: 1,
            token_ttl_secs: 3600,
            signing_secret: String::new(),
            fallback_charset: "gbk".to_string(),
            store_backend: "s3".to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_region: "us-east-1".to_string(),
            listen_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl UnzipConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            put_threshold: env::var("UNZIP_PUT_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.put_threshold),

            chunk_size: env::var("UNZIP_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.chunk_size),

            chunk_workers: env::var("UNZIP_CHUNK_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.chunk_workers),

            token_ttl_secs: env::var("UPLOAD_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.token_ttl_secs),

            signing_secret: env::var("UPLOAD_SIGNING_SECRET").unwrap_or(default.signing_secret),

            fallback_charset: env::var("UNZIP_FALLBACK_CHARSET")
                .unwrap_or(default.fallback_charset),

            store_backend: env::var("UNZIP_STORE")
                .map(|v| v.to_lowercase())
                .unwrap_or(default.store_backend),

            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_access_key: env::var("S3_ACCESS_KEY").ok(),
            s3_secret_key: env::var("S3_SECRET_KEY").ok(),
            s3_region: env::var("S3_REGION").unwrap_or(default.s3_region),

            listen_addr: env::var("UNZIP_LISTEN_ADDR").unwrap_or(default.listen_addr),
        }
    }

    /// Create config for development (in-memory store, fixed secret)
    pub fn development() -> Self {
        Self {
            signing_secret: "development_secret".to_string(),
            store_backend: "memory".to_string(),
            ..Self::default()
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            put_threshold: self.put_threshold,
            chunk: ChunkSettings {
                chunk_size: self.chunk_size,
                workers: self.chunk_workers,
            },
        }
    }
}
