use crate::models::UploadOutcome;
use crate::services::storage::{ChunkSettings, PutRet, ResumableUploader, SimpleUploader};
use crate::services::token::{PutScope, TokenSigner};
use anyhow::Result;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Message reported for any entry that could not be stored.
pub const SAVE_ERROR_MESSAGE: &str = "save unzip file to bucket error";

/// Size-based transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    /// Entries up to this size (inclusive) go through the single-shot transport.
    pub put_threshold: u64,
    pub chunk: ChunkSettings,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            put_threshold: 100 * 1024 * 1024, // 100 MB
            chunk: ChunkSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Simple,
    Chunked,
}

impl UploadSettings {
    pub fn transport_for(&self, size: u64) -> Transport {
        if size <= self.put_threshold {
            Transport::Simple
        } else {
            Transport::Chunked
        }
    }
}

/// Uploads archive entries one at a time, each under its own token.
pub struct UploadDispatcher {
    signer: Arc<dyn TokenSigner>,
    simple: Arc<dyn SimpleUploader>,
    resumable: Arc<dyn ResumableUploader>,
    settings: UploadSettings,
}

impl UploadDispatcher {
    pub fn new(
        signer: Arc<dyn TokenSigner>,
        simple: Arc<dyn SimpleUploader>,
        resumable: Arc<dyn ResumableUploader>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            signer,
            simple,
            resumable,
            settings,
        }
    }

    /// Uses one store for both transports.
    pub fn with_store<S>(signer: Arc<dyn TokenSigner>, store: Arc<S>, settings: UploadSettings) -> Self
    where
        S: SimpleUploader + ResumableUploader + 'static,
    {
        Self::new(signer, store.clone(), store, settings)
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Never fails: transport errors become [`UploadOutcome::Failure`].
    pub async fn upload(
        &self,
        key: &str,
        content: Bytes,
        size: u64,
        bucket: &str,
        overwrite: bool,
    ) -> UploadOutcome {
        match self.try_upload(key, content, size, bucket, overwrite).await {
            Ok(ret) if !ret.hash.is_empty() => UploadOutcome::Success { hash: ret.hash },
            Ok(_) => {
                warn!("Upload of {} returned no hash", key);
                UploadOutcome::Failure {
                    message: SAVE_ERROR_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                warn!("Failed to save {} to bucket {}: {:#}", key, bucket, e);
                UploadOutcome::Failure {
                    message: SAVE_ERROR_MESSAGE.to_string(),
                }
            }
        }
    }

    async fn try_upload(
        &self,
        key: &str,
        content: Bytes,
        size: u64,
        bucket: &str,
        overwrite: bool,
    ) -> Result<PutRet> {
        let scope = PutScope::for_entry(bucket, key, overwrite);
        let token = self.signer.sign(&scope)?;

        match self.settings.transport_for(size) {
            Transport::Simple => {
                debug!("Uploading {} ({} bytes) in one request, scope {}", key, size, scope);
                self.simple.put(&token, key, content).await
            }
            Transport::Chunked => {
                debug!(
                    "Uploading {} ({} bytes) in {} chunks, scope {}",
                    key,
                    size,
                    self.settings.chunk.part_count(size),
                    scope
                );
                self.resumable
                    .put_resumable(&token, key, content, size, &self.settings.chunk)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::{MemoryObjectStore, TransferKind};
    use crate::services::token::JwtTokenSigner;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Duration;

    const MIB: u64 = 1024 * 1024;

    fn setup(settings: UploadSettings) -> (Arc<MemoryObjectStore>, UploadDispatcher) {
        let signer: Arc<dyn TokenSigner> =
            Arc::new(JwtTokenSigner::new("test_secret", Duration::hours(1)));
        let store = Arc::new(MemoryObjectStore::new(signer.clone()));
        let dispatcher = UploadDispatcher::with_store(signer, store.clone(), settings);
        (store, dispatcher)
    }

    #[test]
    fn test_transport_threshold() {
        let settings = UploadSettings::default();
        assert_eq!(settings.transport_for(0), Transport::Simple);
        assert_eq!(settings.transport_for(100 * MIB), Transport::Simple);
        assert_eq!(settings.transport_for(100 * MIB + 1), Transport::Chunked);
        assert_eq!(settings.transport_for(150 * MIB), Transport::Chunked);
    }

    #[tokio::test]
    async fn test_small_entry_uses_single_shot_with_bucket_scope() {
        let (store, dispatcher) = setup(UploadSettings::default());

        let outcome = dispatcher
            .upload("a.txt", Bytes::from_static(b"0123456789"), 10, "mybucket", false)
            .await;

        assert!(outcome.is_success());
        let transfers = store.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].kind, TransferKind::Simple);
        assert_eq!(transfers[0].scope, Some(PutScope::bucket("mybucket")));
    }

    #[tokio::test]
    async fn test_overwrite_narrows_scope_to_key() {
        let (store, dispatcher) = setup(UploadSettings::default());

        dispatcher
            .upload("a.txt", Bytes::from_static(b"0123456789"), 10, "mybucket", true)
            .await;

        assert_eq!(
            store.transfers()[0].scope,
            Some(PutScope::object("mybucket", "a.txt"))
        );
    }

    #[tokio::test]
    async fn test_large_entry_uses_chunked_transport() {
        let (store, dispatcher) = setup(UploadSettings::default());

        // Only the declared size drives the transport choice.
        let outcome = dispatcher
            .upload("big.bin", Bytes::from_static(b"payload"), 150 * MIB, "mybucket", false)
            .await;

        assert!(outcome.is_success());
        let transfers = store.transfers();
        assert_eq!(
            transfers[0].kind,
            TransferKind::Resumable(ChunkSettings {
                chunk_size: 4 * 1024 * 1024,
                workers: 1,
            })
        );
        assert_eq!(transfers[0].size, 150 * MIB);
    }

    #[tokio::test]
    async fn test_collision_without_overwrite_is_entry_failure() {
        let (store, dispatcher) = setup(UploadSettings::default());
        store.insert("mybucket", "a.txt", Bytes::from_static(b"old"));

        let outcome = dispatcher
            .upload("a.txt", Bytes::from_static(b"new"), 3, "mybucket", false)
            .await;

        assert_eq!(
            outcome,
            UploadOutcome::Failure {
                message: SAVE_ERROR_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_colon_in_bucket_never_grants_overwrite() {
        let (store, dispatcher) = setup(UploadSettings::default());
        store.insert("a", "b", Bytes::from_static(b"original"));

        let outcome = dispatcher
            .upload("b", Bytes::from_static(b"replacement"), 11, "a:b", false)
            .await;

        assert!(outcome.is_success());
        assert_eq!(store.transfers()[0].scope, Some(PutScope::bucket("a:b")));
        assert_eq!(store.get("a", "b").unwrap(), Bytes::from_static(b"original"));
        assert_eq!(store.get("a:b", "b").unwrap(), Bytes::from_static(b"replacement"));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_is_entry_failure() {
        let (store, dispatcher) = setup(UploadSettings {
            put_threshold: 4,
            chunk: ChunkSettings {
                chunk_size: 0,
                workers: 1,
            },
        });

        let outcome = dispatcher
            .upload("big.bin", Bytes::from_static(b"payload"), 7, "mybucket", false)
            .await;

        assert_eq!(
            outcome,
            UploadOutcome::Failure {
                message: SAVE_ERROR_MESSAGE.to_string()
            }
        );
        assert!(store.get("mybucket", "big.bin").is_none());
    }

    struct NoHashUploader;

    #[async_trait]
    impl SimpleUploader for NoHashUploader {
        async fn put(&self, _token: &str, key: &str, _content: Bytes) -> Result<PutRet> {
            Ok(PutRet {
                key: key.to_string(),
                hash: String::new(),
            })
        }
    }

    #[async_trait]
    impl ResumableUploader for NoHashUploader {
        async fn put_resumable(
            &self,
            _token: &str,
            _key: &str,
            _content: Bytes,
            _size: u64,
            _settings: &ChunkSettings,
        ) -> Result<PutRet> {
            Err(anyhow!("connection reset"))
        }
    }

    #[tokio::test]
    async fn test_missing_hash_and_transport_error_are_failures() {
        let signer: Arc<dyn TokenSigner> =
            Arc::new(JwtTokenSigner::new("test_secret", Duration::hours(1)));
        let dispatcher = UploadDispatcher::with_store(
            signer,
            Arc::new(NoHashUploader),
            UploadSettings::default(),
        );

        let small = dispatcher
            .upload("a.txt", Bytes::from_static(b"x"), 1, "mybucket", false)
            .await;
        assert!(!small.is_success());

        let large = dispatcher
            .upload("b.bin", Bytes::from_static(b"x"), 200 * MIB, "mybucket", false)
            .await;
        assert!(!large.is_success());
    }
}
