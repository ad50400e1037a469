//! Extraction of detection job output archives.
//!
//! The service writes its results as `output.tar.gz` holding a single file.
//! Zip archives are accepted as well. Only the first regular file is read.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use zip::ZipArchive;

use crate::error::AnalysisError;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Supported archive formats, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(GZIP_MAGIC) {
            Some(Self::TarGz)
        } else if bytes.starts_with(ZIP_MAGIC) {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Return the contents of the first file in the archive.
    pub fn extract_first(bytes: &[u8]) -> Result<Vec<u8>, AnalysisError> {
        match ArchiveFormat::detect(bytes) {
            Some(ArchiveFormat::TarGz) => Self::first_from_tar_gz(bytes),
            Some(ArchiveFormat::Zip) => Self::first_from_zip(bytes),
            None => Err(AnalysisError::Decode(
                "unrecognised archive format".to_string(),
            )),
        }
    }

    fn first_from_tar_gz(bytes: &[u8]) -> Result<Vec<u8>, AnalysisError> {
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        let entries = archive
            .entries()
            .map_err(|e| AnalysisError::Decode(format!("invalid tar.gz archive: {}", e)))?;

        for entry in entries {
            let mut entry =
                entry.map_err(|e| AnalysisError::Decode(format!("invalid tar.gz archive: {}", e)))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let mut out = Vec::new();
            entry
                .read_to_end(&mut out)
                .map_err(|e| AnalysisError::Decode(format!("failed to read tar entry: {}", e)))?;
            return Ok(out);
        }

        Err(AnalysisError::Decode("archive has no entries".to_string()))
    }

    fn first_from_zip(bytes: &[u8]) -> Result<Vec<u8>, AnalysisError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| AnalysisError::Decode(format!("invalid zip archive: {}", e)))?;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| AnalysisError::Decode(format!("invalid zip entry: {}", e)))?;
            if file.is_dir() {
                continue;
            }
            let mut out = Vec::new();
            file.read_to_end(&mut out)
                .map_err(|e| AnalysisError::Decode(format!("failed to read zip entry: {}", e)))?;
            return Ok(out);
        }

        Err(AnalysisError::Decode("archive has no entries".to_string()))
    }
}
