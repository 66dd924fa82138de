//! Artifact retrieval from the object store

use crate::deadline::within;
use ai4ng_common::object_store::{ObjectStore, ObjectStoreError};
use ai4ng_common::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ArtifactFetcher {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ArtifactFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Raw object body
    pub async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let what = format!("get object {}", path);
        let body = within(
            self.timeout,
            &what,
            ObjectStoreError::Unavailable,
            self.store.get(path),
        )
        .await?;
        debug!(path, bytes = body.len(), "Fetched object");
        Ok(body)
    }

    /// Object body as standard base64
    pub async fn fetch_binary(&self, path: &str) -> Result<String> {
        let body = self.fetch_bytes(path).await?;
        Ok(STANDARD.encode(body))
    }

    /// Object body as UTF-8 text
    pub async fn fetch_text(&self, path: &str) -> Result<String> {
        let body = self.fetch_bytes(path).await?;
        String::from_utf8(body)
            .map_err(|e| Error::unexpected(format!("object {} is not UTF-8 text: {}", path, e)))
    }

    /// Object body parsed as JSON
    pub async fn fetch_json(&self, path: &str) -> Result<Value> {
        let text = self.fetch_text(path).await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::unexpected(format!("object {} is not valid JSON: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai4ng_common::object_store::MemoryObjectStore;
    use serde_json::json;

    fn fetcher() -> ArtifactFetcher {
        let store = MemoryObjectStore::new();
        store.put("graphs/u1/DA plot.png", vec![0x89, b'P', b'N', b'G']).unwrap();
        store.put("graphs/u1/DA plot.json", r#"{"x": [1, 2]}"#).unwrap();
        store.put("graphs/u1/broken.json", vec![0xff, 0xfe]).unwrap();
        ArtifactFetcher::new(Arc::new(store), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_fetch_binary_is_base64() {
        let data = fetcher().fetch_binary("s3://graphs/u1/DA plot.png").await.unwrap();
        assert_eq!(data, "iVBORw==");
    }

    #[tokio::test]
    async fn test_fetch_json() {
        let data = fetcher().fetch_json("graphs/u1/DA plot.json").await.unwrap();
        assert_eq!(data, json!({"x": [1, 2]}));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_unexpected() {
        let err = fetcher().fetch_text("graphs/u1/broken.json").await.unwrap_err();
        assert!(matches!(err, Error::Unexpected(_)));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let err = fetcher().fetch_binary("graphs/u1/nope.png").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
