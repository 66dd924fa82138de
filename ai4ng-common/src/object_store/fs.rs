//! Filesystem-backed object store (local mirror of the bucket layout)

use super::{normalize_path, ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Objects stored as files under `root/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let relative = normalize_path(path)?;
        let full_path = self.root.join(&relative);
        debug!(path = %full_path.display(), "Reading object from filesystem");

        tokio::fs::read(&full_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ObjectStoreError::NotFound(relative),
            ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                ObjectStoreError::Unavailable(format!("{}: {}", full_path.display(), e))
            }
            _ => ObjectStoreError::Backend(format!("{}: {}", full_path.display(), e)),
        })
    }
}
