use crate::error::UnzipError;
use crate::models::{UnzipRequest, UnzipResult};
use crate::services::archive::ZipArchiveReader;
use crate::services::charset::FilenameDecoder;
use crate::services::command::UnzipCommand;
use crate::services::dispatcher::UploadDispatcher;
use crate::services::fetcher::{SourceFetcher, ensure_zip_mime};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

/// Expands a stored ZIP archive into individual objects.
pub struct UnzipService {
    fetcher: Arc<dyn SourceFetcher>,
    names: Arc<dyn FilenameDecoder>,
    dispatcher: UploadDispatcher,
}

impl UnzipService {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        names: Arc<dyn FilenameDecoder>,
        dispatcher: UploadDispatcher,
    ) -> Self {
        Self {
            fetcher,
            names,
            dispatcher,
        }
    }

    /// Runs one unzip job.
    ///
    /// Input, fetch and decode failures abort the job with no partial result.
    /// Upload failures are reported per file and never abort it. Entries are
    /// uploaded strictly in archive order, one at a time.
    pub async fn unzip(&self, request: &UnzipRequest) -> Result<UnzipResult, UnzipError> {
        ensure_zip_mime(&request.src.mime_type)?;
        let command = UnzipCommand::parse(&request.cmd)?;

        info!(
            "📦 Unzipping {} into bucket {} (overwrite={})",
            request.src.url, command.bucket, command.overwrite
        );

        let data = self.fetcher.fetch(&request.src.url).await?;
        info!("📥 Retrieved {} bytes", data.len());

        let mut archive = ZipArchiveReader::open(data)?;
        info!("🗂️  Archive holds {} entries", archive.len());
        let entries = archive.entries(self.names.as_ref())?;

        let mut result = UnzipResult::default();
        for entry in entries.iter().filter(|e| !e.is_dir) {
            let content = Bytes::from(archive.read(entry)?);
            let outcome = self
                .dispatcher
                .upload(
                    &entry.name,
                    content,
                    entry.size,
                    &command.bucket,
                    command.overwrite,
                )
                .await;
            result.push(entry.name.as_str(), outcome);
        }

        if result.failed() > 0 {
            warn!(
                "⚠️  Unzipped {} of {} files, {} failed",
                result.succeeded(),
                result.files.len(),
                result.failed()
            );
        } else {
            info!("✅ Unzipped {} files", result.files.len());
        }

        Ok(result)
    }
}
