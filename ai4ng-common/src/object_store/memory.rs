//! In-memory object store

use super::{normalize_path, ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Objects held in a map keyed by normalized path
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, body: impl Into<Vec<u8>>) -> Result<(), ObjectStoreError> {
        let key = normalize_path(path)?;
        self.objects
            .write()
            .map_err(|_| ObjectStoreError::Backend("memory object store lock poisoned".to_string()))?
            .insert(key, body.into());
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let key = normalize_path(path)?;
        let objects = self
            .objects
            .read()
            .map_err(|_| ObjectStoreError::Backend("memory object store lock poisoned".to_string()))?;
        objects
            .get(&key)
            .cloned()
            .ok_or(ObjectStoreError::NotFound(key))
    }
}
