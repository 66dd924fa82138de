//! In-process record store
//!
//! Used for local runs seeded from a typed-JSON export and as the fixture
//! backend in tests. Storage order is insertion order.

use super::{
    Item, KeySchema, QueryRequest, RecordStore, ScanRequest, StoreError, StoreResult, TableSchema,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

struct MemoryTable {
    schema: TableSchema,
    items: Vec<Item>,
}

/// Seed file layout: `{"tables": {"<name>": [<item>, ...]}}`
#[derive(Debug, Deserialize)]
struct SeedFile {
    tables: BTreeMap<String, Vec<Item>>,
}

/// In-memory [`RecordStore`]
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given tables declared
    ///
    /// A schema repeated by name replaces the earlier declaration.
    pub fn with_tables(schemas: impl IntoIterator<Item = TableSchema>) -> Self {
        let tables = schemas
            .into_iter()
            .map(|schema| {
                let table = MemoryTable {
                    schema,
                    items: Vec::new(),
                };
                (table.schema.name.clone(), table)
            })
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Insert an item, replacing any item with the same primary key
    pub fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let key = &table.schema.primary_key;
        if !key.indexes(&item) {
            return Err(StoreError::InvalidRequest(format!(
                "item is missing primary key attributes of table {}",
                table.schema.name
            )));
        }

        match table
            .items
            .iter()
            .position(|existing| same_primary_key(key, existing, &item))
        {
            Some(pos) => table.items[pos] = item,
            None => table.items.push(item),
        }
        Ok(())
    }

    /// Load items from typed-JSON seed text into already declared tables
    ///
    /// Returns the number of items loaded.
    pub fn seed_from_str(&self, json: &str) -> StoreResult<usize> {
        let seed: SeedFile = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidRequest(format!("invalid seed data: {}", e)))?;

        let mut loaded = 0;
        for (table, items) in seed.tables {
            for item in items {
                self.put_item(&table, item)?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Load a typed-JSON seed file
    pub fn seed_from_file(&self, path: &Path) -> StoreResult<usize> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Backend(format!("read seed file {}: {}", path.display(), e))
        })?;
        let loaded = self.seed_from_str(&json)?;
        info!("Seeded {} items from {}", loaded, path.display());
        Ok(loaded)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

fn same_primary_key(key: &KeySchema, a: &Item, b: &Item) -> bool {
    let same = |name: &str| match (a.get(name), b.get(name)) {
        (Some(x), Some(y)) => x.matches(y),
        _ => false,
    };
    same(&key.partition.name) && key.sort.as_ref().map_or(true, |s| same(&s.name))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, request: &QueryRequest) -> StoreResult<Vec<Item>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let table = tables
            .get(&request.table)
            .ok_or_else(|| StoreError::TableNotFound(request.table.clone()))?;

        let key_schema = table.schema.key_schema(request.index.as_deref())?;
        key_schema.validate_key(&request.key)?;

        let mut matched: Vec<&Item> = table
            .items
            .iter()
            .filter(|item| key_schema.indexes(item))
            .filter(|item| request.key.iter().all(|c| c.matches(item)))
            .collect();

        // Stable sort: equal sort keys keep storage order in both directions
        if request.descending {
            matched.sort_by(|a, b| key_schema.sort_cmp(b, a));
        } else {
            matched.sort_by(|a, b| key_schema.sort_cmp(a, b));
        }

        let limit = request.limit.unwrap_or(usize::MAX);
        let items: Vec<Item> = matched
            .into_iter()
            .filter(|item| request.filter.iter().all(|c| c.matches(item)))
            .take(limit)
            .cloned()
            .collect();

        debug!(
            table = %request.table,
            index = ?request.index,
            returned = items.len(),
            "Memory store query"
        );
        Ok(items)
    }

    async fn scan(&self, request: &ScanRequest) -> StoreResult<Vec<Item>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let table = tables
            .get(&request.table)
            .ok_or_else(|| StoreError::TableNotFound(request.table.clone()))?;

        let limit = request.limit.unwrap_or(usize::MAX);
        let items: Vec<Item> = table
            .items
            .iter()
            .filter(|item| request.filter.iter().all(|c| c.matches(item)))
            .take(limit)
            .cloned()
            .collect();

        debug!(table = %request.table, returned = items.len(), "Memory store scan");
        Ok(items)
    }
}
