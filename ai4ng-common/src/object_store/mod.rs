//! Object store boundary
//!
//! Objects are addressed by a storage path as recorded in the file index.
//! Paths may carry an `s3://` scheme; backends see the normalized
//! `bucket/key` form.

pub mod fs;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;

pub use fs::FsObjectStore;
#[cfg(feature = "http")]
pub use http::HttpObjectStore;
pub use memory::MemoryObjectStore;

use crate::Error;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an object store backend
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Transient outage, throttling or timeout
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object store error: {0}")]
    Backend(String),
}

impl From<ObjectStoreError> for Error {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound(path) => Error::NotFound(format!("object {}", path)),
            ObjectStoreError::Unavailable(msg) => Error::DependencyUnavailable(msg),
            other => Error::Unexpected(other.to_string()),
        }
    }
}

/// Object store client
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full object body at `path`
    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError>;
}

/// Normalize a storage path to `bucket/key` form
///
/// Strips an `s3://` scheme and leading slashes, and rejects empty paths and
/// `.`/`..` segments.
pub fn normalize_path(path: &str) -> Result<String, ObjectStoreError> {
    let trimmed = path.trim();
    let without_scheme = trimmed.strip_prefix("s3://").unwrap_or(trimmed);
    let relative = without_scheme.trim_start_matches('/');

    if relative.is_empty() {
        return Err(ObjectStoreError::InvalidPath(path.to_string()));
    }
    if relative
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(ObjectStoreError::InvalidPath(path.to_string()));
    }
    Ok(relative.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_scheme_and_slashes() {
        assert_eq!(
            normalize_path("s3://eeg-results/u1/42/DA plot.png").unwrap(),
            "eeg-results/u1/42/DA plot.png"
        );
        assert_eq!(normalize_path("/bucket/key.json").unwrap(), "bucket/key.json");
    }

    #[test]
    fn test_normalize_rejects_traversal() {
        assert!(normalize_path("bucket/../secret").is_err());
        assert!(normalize_path("bucket//key").is_err());
        assert!(normalize_path("  ").is_err());
        assert!(normalize_path("s3://").is_err());
    }

    #[test]
    fn test_error_classification() {
        let err: Error = ObjectStoreError::Unavailable("503".to_string()).into();
        assert!(err.is_retryable());
        let err: Error = ObjectStoreError::NotFound("a/b".to_string()).into();
        assert!(matches!(err, Error::NotFound(_)));
        let err: Error = ObjectStoreError::InvalidPath("..".to_string()).into();
        assert!(matches!(err, Error::Unexpected(_)));
    }
}
