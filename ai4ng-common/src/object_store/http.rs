//! HTTP object store client
//!
//! Fetches `GET {base_url}/{bucket}/{key}` from an S3-compatible endpoint
//! or gateway. Path segments are percent-encoded, so artifact names with
//! spaces and parentheses resolve correctly.

use super::{normalize_path, ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;

const USER_AGENT: &str = concat!("ai4ng/", env!("CARGO_PKG_VERSION"));

/// HTTP [`ObjectStore`]
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ObjectStoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ObjectStoreError::Backend(format!("invalid base url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ObjectStoreError::Backend(format!(
                "base url cannot carry a path: {}",
                base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Full URL for a storage path
    pub fn object_url(&self, path: &str) -> Result<Url, ObjectStoreError> {
        let relative = normalize_path(path)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::Backend("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(relative.split('/'));
        Ok(url)
    }
}

/// Classify an HTTP status for an object fetch
fn classify_status(status: StatusCode, path: &str) -> ObjectStoreError {
    match status {
        StatusCode::NOT_FOUND => ObjectStoreError::NotFound(path.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ObjectStoreError::Unavailable(format!("{} for {}", status, path))
        }
        s if s.is_server_error() => ObjectStoreError::Unavailable(format!("{} for {}", s, path)),
        s => ObjectStoreError::Backend(format!("{} for {}", s, path)),
    }
}

fn classify_transport(err: reqwest::Error) -> ObjectStoreError {
    if err.is_timeout() || err.is_connect() {
        ObjectStoreError::Unavailable(err.to_string())
    } else {
        ObjectStoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let url = self.object_url(path)?;
        tracing::debug!(url = %url, "Fetching object over HTTP");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, path));
        }

        let body = response.bytes().await.map_err(classify_transport)?;
        Ok(body.to_vec())
    }
}
