use thiserror::Error;

/// Failures that abort a whole unzip operation.
///
/// Per-file upload failures never surface here; they are recorded on the
/// corresponding entry of the result instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnzipError {
    #[error("unsupported mimetype to unzip")]
    UnsupportedMimeType,

    #[error("invalid unzip command format")]
    InvalidCommand,

    #[error("invalid unzip parameter 'bucket'")]
    InvalidBucket,

    #[error("invalid unzip parameter 'overwrite'")]
    InvalidOverwrite,

    #[error("retrieve resource data failed")]
    Retrieve,

    #[error("read resource data failed")]
    ReadBody,

    #[error("invalid zip file")]
    InvalidZip,

    #[error("open zip file content failed")]
    OpenEntry,

    #[error("unzip the file content failed")]
    InflateEntry,
}

impl UnzipError {
    /// True for errors raised before any network access took place.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            UnzipError::UnsupportedMimeType
                | UnzipError::InvalidCommand
                | UnzipError::InvalidBucket
                | UnzipError::InvalidOverwrite
        )
    }
}
