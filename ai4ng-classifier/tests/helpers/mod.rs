//! Shared fixtures: seeded in-memory stores and misbehaving backends

#![allow(dead_code)]

use ai4ng_classifier::config::ServiceConfig;
use ai4ng_common::object_store::{MemoryObjectStore, ObjectStore, ObjectStoreError};
use ai4ng_common::store::{
    Item, MemoryRecordStore, QueryRequest, RecordStore, ScanRequest, StoreResult,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G'];
pub const PNG_BASE64: &str = "iVBORw==";

pub fn item(value: Value) -> Item {
    serde_json::from_value(value).expect("fixture item should be typed JSON")
}

/// Classifier records
///
/// u1 owns 7 and 8 (session 42, 8 newer), 10 (session 43, named) and one
/// record with an unreadable id. u2 owns 9 (session 42, newest of all).
pub fn classifier_items() -> Vec<Item> {
    vec![
        item(json!({
            "classifierId": {"N": "7"},
            "sessionId": {"N": "42"},
            "userId": {"S": "u1"},
            "timestamp": {"N": "1700000000000"},
            "cf": {"M": {"param": {"M": {
                "a0": {"N": "0.5"},
                "a1N": {"L": [{"N": "0.1"}, {"N": "0.2"}]}
            }}}}
        })),
        item(json!({
            "classifierId": {"N": "8"},
            "sessionId": {"N": "42"},
            "userId": {"S": "u1"},
            "timestamp": {"N": "1700000500000"},
            "cf": {"S": "{\"param\":{\"M\":{\"a0\":{\"N\":\"1.25\"},\"a1N\":{\"L\":[{\"N\":\"3\"}]}}}}"}
        })),
        item(json!({
            "classifierId": {"N": "9"},
            "sessionId": {"N": "42"},
            "userId": {"S": "u2"},
            "timestamp": {"N": "1700000900000"}
        })),
        item(json!({
            "classifierId": {"N": "10"},
            "sessionId": {"N": "43"},
            "sessionName": {"S": "Morning calibration"},
            "userId": {"S": "u1"},
            "timestamp": {"N": "1700001000000"}
        })),
        item(json!({
            "classifierId": {"N": "not-a-number"},
            "userId": {"S": "u1"},
            "cf": {"S": "{}"}
        })),
    ]
}

/// File index records
///
/// u1 has five artifacts for session 42 and one for session 43 ("Morning
/// calibration"); u2 has one for session 42.
pub fn file_items() -> Vec<Item> {
    let file = |user: &str, session: i64, name: &str| {
        item(json!({
            "sessionId": {"S": session.to_string()},
            "userId": {"S": user},
            "name": {"S": name},
            "path": {"S": format!("s3://graphs/{}/{}/{}", user, session, name)}
        }))
    };
    vec![
        file("u1", 42, "DA plot.png"),
        file("u1", 42, "DA plot (smoothed).png"),
        file("u1", 42, "heatmap (Freq v4).png"),
        file("u1", 42, "DA plot.json"),
        file("u1", 42, "confusion.png"),
        file("u2", 42, "DA plot.png"),
        file("u1", 43, "DA plot.png"),
    ]
}

pub fn record_store(config: &ServiceConfig) -> MemoryRecordStore {
    let store = MemoryRecordStore::with_tables([
        config.classifier_table.table_schema(),
        config.file_index.table_schema(),
    ]);
    seed(&store, config);
    store
}

pub fn seed(store: &MemoryRecordStore, config: &ServiceConfig) {
    for item in classifier_items() {
        store
            .put_item(&config.classifier_table.table_name, item)
            .expect("seed classifier");
    }
    for item in file_items() {
        store
            .put_item(&config.file_index.table_name, item)
            .expect("seed file index");
    }
}

/// Objects for every indexed artifact except u1's smoothed plot
pub fn object_store() -> MemoryObjectStore {
    let store = MemoryObjectStore::new();
    store.put("graphs/u1/42/DA plot.png", PNG_BYTES).unwrap();
    store.put("graphs/u1/42/heatmap (Freq v4).png", PNG_BYTES).unwrap();
    store.put("graphs/u1/42/confusion.png", PNG_BYTES).unwrap();
    store
        .put("graphs/u1/42/DA plot.json", r#"{"accuracy": [0.5, 0.75]}"#)
        .unwrap();
    store.put("graphs/u2/42/DA plot.png", PNG_BYTES).unwrap();
    store.put("graphs/u1/43/DA plot.png", PNG_BYTES).unwrap();
    store
}

/// Object store that reports an outage for paths containing `failing`
pub struct FlakyObjectStore {
    pub inner: MemoryObjectStore,
    pub failing: String,
}

#[async_trait]
impl ObjectStore for FlakyObjectStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        if path.contains(&self.failing) {
            return Err(ObjectStoreError::Unavailable(format!("{} throttled", path)));
        }
        self.inner.get(path).await
    }
}

/// Record store whose calls never finish in time
pub struct StalledRecordStore;

#[async_trait]
impl RecordStore for StalledRecordStore {
    async fn query(&self, _request: &QueryRequest) -> StoreResult<Vec<Item>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }

    async fn scan(&self, _request: &ScanRequest) -> StoreResult<Vec<Item>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }
}

pub fn arc_objects(store: impl ObjectStore + 'static) -> Arc<dyn ObjectStore> {
    Arc::new(store)
}
