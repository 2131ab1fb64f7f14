use crate::error::UnzipError;
use crate::services::charset::FilenameDecoder;
use bytes::Bytes;
use std::io::{Cursor, Read};
use tracing::warn;
use zip::ZipArchive;

/// One central-directory record of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the central directory.
    pub index: usize,
    /// Entry name converted to UTF-8.
    pub name: String,
    pub is_dir: bool,
    /// Uncompressed size declared by the archive.
    pub size: u64,
}

/// Random-access reader over an archive held fully in memory.
pub struct ZipArchiveReader {
    archive: ZipArchive<Cursor<Bytes>>,
}

impl ZipArchiveReader {
    pub fn open(data: Bytes) -> Result<Self, UnzipError> {
        let archive = ZipArchive::new(Cursor::new(data)).map_err(|e| {
            warn!("Failed to parse ZIP: {}", e);
            UnzipError::InvalidZip
        })?;
        Ok(Self { archive })
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Lists every record in central-directory order without inflating any
    /// content. A single unreadable record fails the whole listing.
    pub fn entries(&mut self, names: &dyn FilenameDecoder) -> Result<Vec<ArchiveEntry>, UnzipError> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self.archive.by_index_raw(index).map_err(|e| {
                warn!("Failed to read ZIP entry {}: {}", index, e);
                UnzipError::InvalidZip
            })?;

            entries.push(ArchiveEntry {
                index,
                name: names.decode(file.name_raw()),
                is_dir: file.is_dir(),
                size: file.size(),
            });
        }
        Ok(entries)
    }

    /// Inflates one entry completely. The entry's reader is released before
    /// this returns.
    pub fn read(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, UnzipError> {
        let mut file = self.archive.by_index(entry.index).map_err(|e| {
            warn!("Failed to open ZIP entry {}: {}", entry.name, e);
            UnzipError::OpenEntry
        })?;

        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|e| {
            warn!("Failed to inflate ZIP entry {}: {}", entry.name, e);
            UnzipError::InflateEntry
        })?;
        Ok(content)
    }
}
