use crate::services::token::{PutScope, TokenSigner};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, warn};

/// Response of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRet {
    pub key: String,
    pub hash: String,
}

/// Tuning of the chunked transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    pub chunk_size: usize,
    /// Chunks of one object uploaded concurrently.
    pub workers: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: 4 * 1024 * 1024, // 4 MB
            workers: 1,
        }
    }
}

impl ChunkSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk size must be positive");
        }
        if self.workers == 0 {
            bail!("chunk worker count must be positive");
        }
        Ok(())
    }

    /// Zero when the settings carry no chunk size.
    pub fn part_count(&self, size: u64) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        size.div_ceil(self.chunk_size as u64).max(1)
    }
}

/// S3 rejects smaller parts anywhere but at the end of a multipart upload.
pub const S3_MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Byte ranges of the multipart parts for `len` bytes. Each part spans a whole
/// number of chunks and at least [`S3_MIN_PART_SIZE`]; only the last may be
/// shorter. `chunk_size` must be positive.
fn part_ranges(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let part_size = S3_MIN_PART_SIZE.div_ceil(chunk_size) * chunk_size;
    let mut ranges: Vec<Range<usize>> = (0..len)
        .step_by(part_size)
        .map(|start| start..(start + part_size).min(len))
        .collect();
    if ranges.is_empty() {
        ranges.push(0..0);
    }
    ranges
}

/// Sends a whole object in one request.
#[async_trait]
pub trait SimpleUploader: Send + Sync {
    async fn put(&self, token: &str, key: &str, content: Bytes) -> Result<PutRet>;
}

/// Sends an object as a sequence of fixed-size chunks.
#[async_trait]
pub trait ResumableUploader: Send + Sync {
    async fn put_resumable(
        &self,
        token: &str,
        key: &str,
        content: Bytes,
        size: u64,
        settings: &ChunkSettings,
    ) -> Result<PutRet>;
}

/// A store offering both transports.
#[async_trait]
pub trait ObjectStore: SimpleUploader + ResumableUploader {
    fn kind(&self) -> &'static str;

    async fn health_check(&self) -> bool;
}

pub struct S3ObjectStore {
    client: Client,
    signer: Arc<dyn TokenSigner>,
}

impl S3ObjectStore {
    pub fn new(client: Client, signer: Arc<dyn TokenSigner>) -> Self {
        Self { client, signer }
    }

    /// Resolves the target bucket from the token and enforces its scope.
    async fn authorize(&self, token: &str, key: &str) -> Result<String> {
        let policy = self.signer.verify(token)?;
        let PutScope { bucket, .. } = &policy.scope;

        if !policy.scope.admits(key) {
            bail!("key {} is outside of upload scope {}", key, policy.scope);
        }
        if !policy.scope.allows_overwrite() && self.file_exists(bucket, key).await? {
            bail!("file exists");
        }

        Ok(bucket.clone())
    }

    async fn file_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let res = self.client.head_object().bucket(bucket).key(key).send().await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow!(service_error))
                }
            }
        }
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        content: &Bytes,
        settings: &ChunkSettings,
    ) -> Result<Vec<CompletedPart>> {
        let client = &self.client;
        let ranges = part_ranges(content.len(), settings.chunk_size);
        debug!("Sending {} as {} parts", key, ranges.len());

        stream::iter(ranges.into_iter().enumerate())
            .map(|(i, range)| {
                let body = content.slice(range);
                let part_number = i as i32 + 1;
                async move {
                    let upload_part_res = client
                        .upload_part()
                        .bucket(bucket)
                        .key(key)
                        .upload_id(upload_id)
                        .body(ByteStream::from(body))
                        .part_number(part_number)
                        .send()
                        .await?;

                    debug!("Uploaded part {} of {}", part_number, key);
                    Ok::<_, anyhow::Error>(
                        CompletedPart::builder()
                            .e_tag(upload_part_res.e_tag().unwrap_or_default())
                            .part_number(part_number)
                            .build(),
                    )
                }
            })
            .buffered(settings.workers)
            .try_collect()
            .await
    }
}

fn etag_hash(etag: Option<&str>) -> String {
    etag.unwrap_or_default().trim_matches('"').to_string()
}

#[async_trait]
impl SimpleUploader for S3ObjectStore {
    async fn put(&self, token: &str, key: &str, content: Bytes) -> Result<PutRet> {
        let bucket = self.authorize(token, key).await?;

        let output = self
            .client
            .put_object()
            .bucket(&bucket)
            .key(key)
            .body(ByteStream::from(content))
            .send()
            .await?;

        Ok(PutRet {
            key: key.to_string(),
            hash: etag_hash(output.e_tag()),
        })
    }
}

#[async_trait]
impl ResumableUploader for S3ObjectStore {
    async fn put_resumable(
        &self,
        token: &str,
        key: &str,
        content: Bytes,
        size: u64,
        settings: &ChunkSettings,
    ) -> Result<PutRet> {
        settings.validate()?;
        if content.len() as u64 != size {
            bail!(
                "declared size {} does not match content length {}",
                size,
                content.len()
            );
        }
        let bucket = self.authorize(token, key).await?;

        let multipart_upload_res = self
            .client
            .create_multipart_upload()
            .bucket(&bucket)
            .key(key)
            .send()
            .await?;

        let upload_id = multipart_upload_res
            .upload_id()
            .ok_or_else(|| anyhow!("No upload ID"))?;

        let completed_parts = match self
            .upload_parts(&bucket, key, upload_id, &content, settings)
            .await
        {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .send()
                    .await
                {
                    warn!("Failed to abort multipart upload of {}: {}", key, abort_err);
                }
                return Err(e);
            }
        };

        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await?;

        Ok(PutRet {
            key: key.to_string(),
            hash: etag_hash(output.e_tag()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn kind(&self) -> &'static str {
        "s3"
    }

    async fn health_check(&self) -> bool {
        self.client.list_buckets().send().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_settings() {
        let settings = ChunkSettings::default();
        assert_eq!(settings.chunk_size, 4 * 1024 * 1024);
        assert_eq!(settings.workers, 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_chunk_settings() {
        let zero_chunk = ChunkSettings {
            chunk_size: 0,
            workers: 1,
        };
        assert!(zero_chunk.validate().is_err());

        let zero_workers = ChunkSettings {
            chunk_size: 1024,
            workers: 0,
        };
        assert!(zero_workers.validate().is_err());
    }

    #[test]
    fn test_part_count() {
        let settings = ChunkSettings::default();
        assert_eq!(settings.part_count(0), 1);
        assert_eq!(settings.part_count(4 * 1024 * 1024), 1);
        assert_eq!(settings.part_count(4 * 1024 * 1024 + 1), 2);
        assert_eq!(settings.part_count(150 * 1024 * 1024), 38);
    }

    #[test]
    fn test_part_count_without_chunk_size() {
        let settings = ChunkSettings {
            chunk_size: 0,
            workers: 1,
        };
        assert_eq!(settings.part_count(10), 0);
    }

    const MIB: usize = 1024 * 1024;

    #[test]
    fn test_part_ranges_merge_chunks_below_minimum() {
        // 4 MiB chunks are sent two at a time.
        let ranges = part_ranges(150 * MIB, 4 * MIB);
        assert_eq!(ranges.len(), 19);
        assert_eq!(ranges[0], 0..8 * MIB);
        assert_eq!(ranges[1], 8 * MIB..16 * MIB);
        assert_eq!(ranges[18], 144 * MIB..150 * MIB);
        assert!(ranges[..18].iter().all(|r| r.len() >= S3_MIN_PART_SIZE));
        assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn test_part_ranges_keep_large_chunks() {
        let ranges = part_ranges(25 * MIB, 10 * MIB);
        assert_eq!(ranges, vec![0..10 * MIB, 10 * MIB..20 * MIB, 20 * MIB..25 * MIB]);
    }

    #[test]
    fn test_part_ranges_small_content() {
        assert_eq!(part_ranges(0, 4 * MIB), vec![0..0]);
        assert_eq!(part_ranges(3 * MIB, 4 * MIB), vec![0..3 * MIB]);
        // A tiny chunk size still yields parts of the minimum size.
        assert_eq!(part_ranges(6 * MIB, 1000)[0].len() % 1000, 0);
        assert!(part_ranges(6 * MIB, 1000)[0].len() >= S3_MIN_PART_SIZE);
    }

    #[test]
    fn test_etag_hash() {
        assert_eq!(etag_hash(Some("\"abc123\"")), "abc123");
        assert_eq!(etag_hash(Some("abc123")), "abc123");
        assert_eq!(etag_hash(None), "");
    }
}
