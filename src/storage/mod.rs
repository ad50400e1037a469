//! Object storage access.
//!
//! Only downloads are needed: documents are read by key, and detection jobs
//! write their own output to the location declared at submission.

mod fs;
mod http;

use std::fmt;

use async_trait::async_trait;

use crate::error::AnalysisError;

pub use fs::FsObjectStore;
pub use http::HttpObjectStore;

/// A bucket/key pair, written as `s3://bucket/key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse an `s3://bucket/key` URI.
    pub fn parse(uri: &str) -> Result<Self, AnalysisError> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| AnalysisError::Decode(format!("not an s3:// URI: {}", uri)))?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| AnalysisError::Decode(format!("URI has no object key: {}", uri)))?;
        if bucket.is_empty() || key.is_empty() {
            return Err(AnalysisError::Decode(format!(
                "URI has an empty bucket or key: {}",
                uri
            )));
        }
        Ok(Self::new(bucket, key))
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Read access to an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object's full contents.
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>, AnalysisError>;
}
