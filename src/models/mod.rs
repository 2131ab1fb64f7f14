use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Source object the command operates on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceDescriptor {
    pub url: String,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
}

/// An unzip job as handed over by the dispatching framework.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnzipRequest {
    pub cmd: String,
    pub src: SourceDescriptor,
}

impl UnzipRequest {
    pub fn new(cmd: impl Into<String>, url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            src: SourceDescriptor {
                url: url.into(),
                mime_type: mime_type.into(),
            },
        }
    }
}

/// Result of uploading a single archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success { hash: String },
    Failure { message: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnzipFile {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnzipFile {
    pub fn new(key: impl Into<String>, outcome: UploadOutcome) -> Self {
        let (hash, error) = match outcome {
            UploadOutcome::Success { hash } => (Some(hash), None),
            UploadOutcome::Failure { message } => (None, Some(message)),
        };
        Self {
            key: key.into(),
            hash,
            error,
        }
    }
}

/// Per-file outcomes in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnzipResult {
    pub files: Vec<UnzipFile>,
}

impl UnzipResult {
    pub fn push(&mut self, key: impl Into<String>, outcome: UploadOutcome) {
        self.files.push(UnzipFile::new(key, outcome));
    }

    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.hash.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }
}
