use crate::services::storage::{
    ChunkSettings, ObjectStore, PutRet, ResumableUploader, SimpleUploader,
};
use crate::services::token::{PutScope, TokenSigner};
use crate::utils::hash::calculate_hash;
use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Mutex, PoisonError};

/// Which transport carried a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Simple,
    Resumable(ChunkSettings),
}

/// One upload attempt seen by [`MemoryObjectStore`], successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub kind: TransferKind,
    pub key: String,
    /// Scope of the presented token, `None` if it failed verification.
    pub scope: Option<PutScope>,
    pub size: u64,
}

/// In-process object store used for development and tests.
///
/// Enforces token scopes the same way [`crate::services::storage::S3ObjectStore`]
/// does and reports the SHA-256 of the content as the object hash.
pub struct MemoryObjectStore {
    signer: Arc<dyn TokenSigner>,
    objects: DashMap<(String, String), Bytes>,
    transfers: Mutex<Vec<TransferRecord>>,
}

impl MemoryObjectStore {
    pub fn new(signer: Arc<dyn TokenSigner>) -> Self {
        Self {
            signer,
            objects: DashMap::new(),
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|content| content.value().clone())
    }

    /// Stores an object directly, bypassing token checks.
    pub fn insert(&self, bucket: &str, key: &str, content: Bytes) {
        self.objects
            .insert((bucket.to_string(), key.to_string()), content);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.transfers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, kind: TransferKind, token: &str, key: &str, content: Bytes, size: u64) -> Result<PutRet> {
        let policy = self.signer.verify(token);
        self.transfers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TransferRecord {
                kind,
                key: key.to_string(),
                scope: policy.as_ref().ok().map(|p| p.scope.clone()),
                size,
            });

        let scope = policy?.scope;
        if !scope.admits(key) {
            bail!("key {} is outside of upload scope {}", key, scope);
        }

        let hash = calculate_hash(&content);
        match self.objects.entry((scope.bucket.clone(), key.to_string())) {
            Entry::Occupied(mut existing) => {
                if !scope.allows_overwrite() {
                    bail!("file exists");
                }
                existing.insert(content);
            }
            Entry::Vacant(slot) => {
                slot.insert(content);
            }
        }

        Ok(PutRet {
            key: key.to_string(),
            hash,
        })
    }
}

#[async_trait]
impl SimpleUploader for MemoryObjectStore {
    async fn put(&self, token: &str, key: &str, content: Bytes) -> Result<PutRet> {
        let size = content.len() as u64;
        self.store(TransferKind::Simple, token, key, content, size)
    }
}

#[async_trait]
impl ResumableUploader for MemoryObjectStore {
    async fn put_resumable(
        &self,
        token: &str,
        key: &str,
        content: Bytes,
        size: u64,
        settings: &ChunkSettings,
    ) -> Result<PutRet> {
        settings.validate()?;
        self.store(TransferKind::Resumable(*settings), token, key, content, size)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> bool {
        true
    }
}
