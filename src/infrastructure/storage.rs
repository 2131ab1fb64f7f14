use crate::config::UnzipConfig;
use crate::services::dispatcher::UploadDispatcher;
use crate::services::memory_store::MemoryObjectStore;
use crate::services::storage::{ObjectStore, S3ObjectStore};
use crate::services::token::TokenSigner;
use anyhow::{Context, Result};
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

/// Builds the configured object store and a dispatcher uploading into it.
pub async fn setup_storage(
    config: &UnzipConfig,
    signer: Arc<dyn TokenSigner>,
) -> Result<(Arc<dyn ObjectStore>, UploadDispatcher)> {
    let settings = config.upload_settings();

    if config.store_backend == "memory" {
        info!("🧪 In-memory object store (development only)");
        let store = Arc::new(MemoryObjectStore::new(signer.clone()));
        let dispatcher = UploadDispatcher::with_store(signer, store.clone(), settings);
        return Ok((store, dispatcher));
    }

    let endpoint_url = config
        .s3_endpoint
        .clone()
        .context("S3_ENDPOINT must be set")?;
    let access_key = config
        .s3_access_key
        .clone()
        .context("S3_ACCESS_KEY must be set")?;
    let secret_key = config
        .s3_secret_key
        .clone()
        .context("S3_SECRET_KEY must be set")?;

    info!("☁️  S3 Storage: {} (Region: {})", endpoint_url, config.s3_region);

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    let store = Arc::new(S3ObjectStore::new(s3_client, signer.clone()));
    let dispatcher = UploadDispatcher::with_store(signer, store.clone(), settings);
    Ok((store, dispatcher))
}
