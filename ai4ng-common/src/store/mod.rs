//! Key-value store boundary
//!
//! Records are attribute maps with typed values. A backend supports point
//! queries by primary key, queries against named secondary indexes and
//! filtered full scans. Which secondary indexes exist is a property of the
//! deployment, declared through [`TableSchema`].

mod attribute;
mod error;
pub mod memory;
#[cfg(feature = "sqlx")]
pub mod sqlite;

pub use attribute::{AttributeValue, Item};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryRecordStore;
#[cfg(feature = "sqlx")]
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Type of a key attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    S,
    N,
}

/// A key attribute: name and declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
        }
    }

    fn accepts(&self, value: &AttributeValue) -> bool {
        matches!(
            (self.key_type, value),
            (KeyType::S, AttributeValue::S(_)) | (KeyType::N, AttributeValue::N(_))
        )
    }
}

/// Partition key plus optional sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition: KeyAttribute,
    #[serde(default)]
    pub sort: Option<KeyAttribute>,
}

impl KeySchema {
    pub fn new(partition: KeyAttribute, sort: Option<KeyAttribute>) -> Self {
        Self { partition, sort }
    }

    /// Check that `key` is a valid key condition for this schema
    ///
    /// Key conditions are equality on the partition attribute (required)
    /// and optionally on the sort attribute, with values of the declared type.
    pub fn validate_key(&self, key: &[Condition]) -> StoreResult<()> {
        let mut has_partition = false;
        for condition in key {
            let Condition::Eq { attribute, value } = condition else {
                return Err(StoreError::InvalidRequest(
                    "key conditions must be equality conditions".to_string(),
                ));
            };
            let declared = if *attribute == self.partition.name {
                has_partition = true;
                &self.partition
            } else {
                match &self.sort {
                    Some(sort) if *attribute == sort.name => sort,
                    _ => {
                        return Err(StoreError::InvalidRequest(format!(
                            "attribute {} is not part of the key schema",
                            attribute
                        )))
                    }
                }
            };
            if !declared.accepts(value) {
                return Err(StoreError::InvalidRequest(format!(
                    "key attribute {} expects type {:?}, got {}",
                    attribute,
                    declared.key_type,
                    value.type_tag()
                )));
            }
        }
        if !has_partition {
            return Err(StoreError::InvalidRequest(format!(
                "missing condition on partition key {}",
                self.partition.name
            )));
        }
        Ok(())
    }

    /// Whether `item` carries every key attribute with the declared type
    ///
    /// Secondary indexes are sparse: items missing the key are not indexed.
    pub fn indexes(&self, item: &Item) -> bool {
        let present = |key: &KeyAttribute| item.get(&key.name).is_some_and(|v| key.accepts(v));
        present(&self.partition) && self.sort.as_ref().map_or(true, present)
    }

    /// Compare two indexed items by sort key
    pub fn sort_cmp(&self, a: &Item, b: &Item) -> Ordering {
        let Some(sort) = &self.sort else {
            return Ordering::Equal;
        };
        match (a.get(&sort.name), b.get(&sort.name)) {
            (Some(x), Some(y)) => x.key_cmp(y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        }
    }
}

/// Table declaration: primary key and the secondary indexes that exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub primary_key: KeySchema,
    #[serde(default)]
    pub indexes: BTreeMap<String, KeySchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, primary_key: KeySchema) -> Self {
        Self {
            name: name.into(),
            primary_key,
            indexes: BTreeMap::new(),
        }
    }

    pub fn with_index(mut self, name: impl Into<String>, key: KeySchema) -> Self {
        self.indexes.insert(name.into(), key);
        self
    }

    /// Key schema addressed by a query (`None` = primary key)
    pub fn key_schema(&self, index: Option<&str>) -> StoreResult<&KeySchema> {
        match index {
            None => Ok(&self.primary_key),
            Some(name) => self
                .indexes
                .get(name)
                .ok_or_else(|| StoreError::IndexNotFound {
                    table: self.name.clone(),
                    index: name.to_string(),
                }),
        }
    }
}

/// Predicate over one item
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Attribute present and equal (numbers by value)
    Eq {
        attribute: String,
        value: AttributeValue,
    },
    /// At least one nested condition holds; an empty list never holds
    AnyOf(Vec<Condition>),
}

impl Condition {
    pub fn eq(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::Eq {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn any_of(conditions: Vec<Condition>) -> Self {
        Self::AnyOf(conditions)
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::Eq { attribute, value } => item.get(attribute).is_some_and(|v| v.matches(value)),
            Self::AnyOf(conditions) => conditions.iter().any(|c| c.matches(item)),
        }
    }
}

/// Query against the primary key or a named secondary index
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    /// Secondary index name; `None` queries the primary key
    pub index: Option<String>,
    /// Key conditions (equality on partition and optionally sort key)
    pub key: Vec<Condition>,
    /// Additional predicates, all of which must hold
    pub filter: Vec<Condition>,
    /// Return items in descending sort-key order
    pub descending: bool,
    /// Maximum number of items returned after filtering
    pub limit: Option<usize>,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            index: None,
            key: Vec::new(),
            filter: Vec::new(),
            descending: false,
            limit: None,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn key(mut self, condition: Condition) -> Self {
        self.key.push(condition);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Full-table scan with filter
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub table: String,
    pub filter: Vec<Condition>,
    /// Maximum number of items returned after filtering
    pub limit: Option<usize>,
}

impl ScanRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Key-value store client
///
/// Implementations are stateless from the caller's point of view and are
/// shared read-only across concurrent requests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Query by primary key or secondary index, ordered by the addressed
    /// key schema's sort key. Items with equal sort keys keep storage order.
    async fn query(&self, request: &QueryRequest) -> StoreResult<Vec<Item>>;

    /// Scan a whole table, returning matching items in storage order
    async fn scan(&self, request: &ScanRequest) -> StoreResult<Vec<Item>>;
}
