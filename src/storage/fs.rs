//! Filesystem-backed object store.
//!
//! Each bucket is a subdirectory of the root; keys map to relative paths.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{ObjectLocation, ObjectStore};
use crate::error::AnalysisError;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root` (`~` is expanded).
    pub fn new(root: impl AsRef<Path>) -> Self {
        let raw = root.as_ref().to_string_lossy();
        let expanded = shellexpand::tilde(raw.as_ref());
        Self {
            root: PathBuf::from(expanded.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a location to a path under the root, rejecting traversal.
    fn object_path(&self, location: &ObjectLocation) -> Result<PathBuf, AnalysisError> {
        let relative = Path::new(&location.bucket).join(&location.key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(AnalysisError::Download(format!(
                "invalid object key: {}",
                location
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>, AnalysisError> {
        let path = self.object_path(location)?;
        tracing::debug!("Reading {} from {}", location, path.display());
        tokio::fs::read(&path)
            .await
            .map_err(|e| AnalysisError::Download(format!("{}: {}", location, e)))
    }
}
