use crate::error::UnzipError;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

/// The only source media type the operation accepts.
pub const ZIP_MIME_TYPE: &str = "application/zip";

/// Rejects a source before any network access unless it is declared as a ZIP.
pub fn ensure_zip_mime(mime_type: &str) -> Result<(), UnzipError> {
    if mime_type != ZIP_MIME_TYPE {
        return Err(UnzipError::UnsupportedMimeType);
    }
    Ok(())
}

/// Retrieves the full body of a source object.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, UnzipError>;
}

pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

impl HttpSourceFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpSourceFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, UnzipError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Failed to retrieve {}: {}", url, e);
            UnzipError::Retrieve
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Source {} answered with status {}", url, status);
            return Err(UnzipError::Retrieve);
        }

        response.bytes().await.map_err(|e| {
            warn!("Failed to read body of {}: {}", url, e);
            UnzipError::ReadBody
        })
    }
}
