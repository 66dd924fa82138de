//! SQLite-backed record store
//!
//! Every logical table lives in one `kv_items` table, one row per item, the
//! item stored as typed JSON. Key and filter conditions compile to
//! `json_extract` predicates so filtering, ordering and `LIMIT` all run in
//! SQLite. Storage order is row insertion order (`seq`).

use super::{
    AttributeValue, Condition, Item, KeySchema, KeyType, QueryRequest, RecordStore, ScanRequest,
    StoreError, StoreResult, TableSchema,
};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// SQLite [`RecordStore`]
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
    schemas: HashMap<String, TableSchema>,
}

/// Positional bind value for a compiled statement
#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Real(f64),
    Int(i64),
}

impl SqliteRecordStore {
    /// Open (creating if needed) a database file
    pub async fn connect(db_path: &Path, schemas: Vec<TableSchema>) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create {}: {}", parent.display(), e)))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        debug!("Connecting to record store: {}", db_url);
        let pool = SqlitePool::connect(&db_url).await?;
        Self::from_pool(pool, schemas).await
    }

    /// Private in-memory database (single connection so every query sees it)
    pub async fn in_memory(schemas: Vec<TableSchema>) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool, schemas).await
    }

    /// Wrap an existing pool, creating the item table if missing
    pub async fn from_pool(pool: SqlitePool, schemas: Vec<TableSchema>) -> StoreResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_items (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                table_name TEXT NOT NULL,
                item TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kv_items_table ON kv_items(table_name)")
            .execute(&pool)
            .await?;

        let schemas = schemas
            .into_iter()
            .map(|schema| (schema.name.clone(), schema))
            .collect();

        Ok(Self { pool, schemas })
    }

    fn schema(&self, table: &str) -> StoreResult<&TableSchema> {
        self.schemas
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    /// Insert an item, replacing any item with the same primary key in place
    pub async fn put_item(&self, table: &str, item: &Item) -> StoreResult<()> {
        let schema = self.schema(table)?;
        let key = &schema.primary_key;
        if !key.indexes(item) {
            return Err(StoreError::InvalidRequest(format!(
                "item is missing primary key attributes of table {}",
                table
            )));
        }

        let mut key_conditions = vec![Condition::Eq {
            attribute: key.partition.name.clone(),
            value: item[&key.partition.name].clone(),
        }];
        if let Some(sort) = &key.sort {
            key_conditions.push(Condition::Eq {
                attribute: sort.name.clone(),
                value: item[&sort.name].clone(),
            });
        }

        let json = serde_json::to_string(item)
            .map_err(|e| StoreError::InvalidRequest(format!("serialize item: {}", e)))?;

        let mut sql = String::from("UPDATE kv_items SET item = ? WHERE table_name = ?");
        let mut binds = vec![Bind::Text(json.clone()), Bind::Text(table.to_string())];
        for condition in &key_conditions {
            sql.push_str(" AND ");
            push_condition(&mut sql, &mut binds, condition)?;
        }

        let mut update = sqlx::query(&sql);
        for bind in binds {
            update = match bind {
                Bind::Text(v) => update.bind(v),
                Bind::Real(v) => update.bind(v),
                Bind::Int(v) => update.bind(v),
            };
        }
        let updated = update.execute(&self.pool).await?.rows_affected();

        if updated == 0 {
            sqlx::query("INSERT INTO kv_items (table_name, item) VALUES (?, ?)")
                .bind(table)
                .bind(json)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn fetch_items(&self, sql: &str, binds: Vec<Bind>) -> StoreResult<Vec<Item>> {
        let mut query = sqlx::query_scalar::<_, String>(sql);
        for bind in binds {
            query = match bind {
                Bind::Text(v) => query.bind(v),
                Bind::Real(v) => query.bind(v),
                Bind::Int(v) => query.bind(v),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;

        // A corrupt row must not take the whole result down with it
        let items = rows
            .into_iter()
            .filter_map(|raw| match serde_json::from_str::<Item>(&raw) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable row in record store");
                    None
                }
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn query(&self, request: &QueryRequest) -> StoreResult<Vec<Item>> {
        let schema = self.schema(&request.table)?;
        let key_schema = schema.key_schema(request.index.as_deref())?;
        key_schema.validate_key(&request.key)?;

        let (sql, binds) = compile_query(key_schema, request)?;
        debug!(table = %request.table, index = ?request.index, sql = %sql, "SQLite store query");
        self.fetch_items(&sql, binds).await
    }

    async fn scan(&self, request: &ScanRequest) -> StoreResult<Vec<Item>> {
        self.schema(&request.table)?;

        let (sql, binds) = compile_scan(request)?;
        debug!(table = %request.table, sql = %sql, "SQLite store scan");
        self.fetch_items(&sql, binds).await
    }
}

fn compile_query(key_schema: &KeySchema, request: &QueryRequest) -> StoreResult<(String, Vec<Bind>)> {
    let mut sql = String::from("SELECT item FROM kv_items WHERE table_name = ?");
    let mut binds = vec![Bind::Text(request.table.clone())];

    for condition in request.key.iter().chain(request.filter.iter()) {
        sql.push_str(" AND ");
        push_condition(&mut sql, &mut binds, condition)?;
    }

    match &key_schema.sort {
        Some(sort) => {
            // Sparse index: items without the sort key are not indexed
            let path = typed_path(&sort.name, key_tag(sort.key_type))?;
            sql.push_str(" AND json_extract(item, ?) IS NOT NULL");
            binds.push(Bind::Text(path.clone()));

            let direction = if request.descending { "DESC" } else { "ASC" };
            match sort.key_type {
                KeyType::N => sql.push_str(&format!(
                    " ORDER BY CAST(json_extract(item, ?) AS REAL) {}, seq ASC",
                    direction
                )),
                KeyType::S => sql.push_str(&format!(
                    " ORDER BY json_extract(item, ?) {}, seq ASC",
                    direction
                )),
            }
            binds.push(Bind::Text(path));
        }
        None => sql.push_str(" ORDER BY seq ASC"),
    }

    push_limit(&mut sql, &mut binds, request.limit);
    Ok((sql, binds))
}

fn compile_scan(request: &ScanRequest) -> StoreResult<(String, Vec<Bind>)> {
    let mut sql = String::from("SELECT item FROM kv_items WHERE table_name = ?");
    let mut binds = vec![Bind::Text(request.table.clone())];

    for condition in &request.filter {
        sql.push_str(" AND ");
        push_condition(&mut sql, &mut binds, condition)?;
    }

    sql.push_str(" ORDER BY seq ASC");
    push_limit(&mut sql, &mut binds, request.limit);
    Ok((sql, binds))
}

fn push_limit(sql: &mut String, binds: &mut Vec<Bind>, limit: Option<usize>) {
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        binds.push(Bind::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
    }
}

fn push_condition(sql: &mut String, binds: &mut Vec<Bind>, condition: &Condition) -> StoreResult<()> {
    match condition {
        Condition::Eq { attribute, value } => match value {
            AttributeValue::S(s) => {
                sql.push_str("json_extract(item, ?) = ?");
                binds.push(Bind::Text(typed_path(attribute, "S")?));
                binds.push(Bind::Text(s.clone()));
            }
            AttributeValue::N(_) => {
                let number = value.as_number().ok_or_else(|| {
                    StoreError::InvalidRequest(format!("invalid number for {}", attribute))
                })?;
                sql.push_str("CAST(json_extract(item, ?) AS REAL) = ?");
                binds.push(Bind::Text(typed_path(attribute, "N")?));
                binds.push(Bind::Real(number));
            }
            other => {
                let json = serde_json::to_string(other)
                    .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
                sql.push_str("json_extract(item, ?) = json(?)");
                binds.push(Bind::Text(attribute_path(attribute)?));
                binds.push(Bind::Text(json));
            }
        },
        Condition::AnyOf(conditions) => {
            if conditions.is_empty() {
                sql.push_str("0");
                return Ok(());
            }
            sql.push('(');
            for (i, nested) in conditions.iter().enumerate() {
                if i > 0 {
                    sql.push_str(" OR ");
                }
                push_condition(sql, binds, nested)?;
            }
            sql.push(')');
        }
    }
    Ok(())
}

fn key_tag(key_type: KeyType) -> &'static str {
    match key_type {
        KeyType::S => "S",
        KeyType::N => "N",
    }
}

/// JSON path of an attribute (`$."name"`); names are restricted so they can
/// be quoted safely
fn attribute_path(attribute: &str) -> StoreResult<String> {
    let valid = !attribute.is_empty()
        && attribute.len() < 256
        && attribute
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(StoreError::InvalidRequest(format!(
            "invalid attribute name: {:?}",
            attribute
        )));
    }
    Ok(format!("$.\"{}\"", attribute))
}

fn typed_path(attribute: &str, tag: &str) -> StoreResult<String> {
    Ok(format!("{}.{}", attribute_path(attribute)?, tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyAttribute, KeyType};

    const TABLE: &str = "Classifiers";

    fn schema() -> TableSchema {
        TableSchema::new(
            TABLE,
            KeySchema::new(KeyAttribute::new("classifierId", KeyType::N), None),
        )
        .with_index(
            "SessionIdIndex",
            KeySchema::new(
                KeyAttribute::new("sessionId", KeyType::N),
                Some(KeyAttribute::new("timestamp", KeyType::N)),
            ),
        )
    }

    fn item(id: i64, session: i64, user: &str, ts: i64) -> Item {
        let mut item = Item::new();
        item.insert("classifierId".to_string(), AttributeValue::n(id));
        item.insert("sessionId".to_string(), AttributeValue::n(session));
        item.insert("userId".to_string(), AttributeValue::s(user));
        item.insert("timestamp".to_string(), AttributeValue::n(ts));
        item
    }

    async fn store() -> SqliteRecordStore {
        let store = SqliteRecordStore::in_memory(vec![schema()]).await.unwrap();
        store.put_item(TABLE, &item(1, 42, "u1", 100)).await.unwrap();
        store.put_item(TABLE, &item(2, 42, "u1", 300)).await.unwrap();
        store.put_item(TABLE, &item(3, 42, "u2", 500)).await.unwrap();
        store.put_item(TABLE, &item(4, 7, "u1", 200)).await.unwrap();
        store
    }

    fn ids(items: &[Item]) -> Vec<i64> {
        items
            .iter()
            .map(|i| i["classifierId"].as_number().unwrap() as i64)
            .collect()
    }

    #[tokio::test]
    async fn test_index_query_orders_and_limits_in_sql() {
        let store = store().await;
        let request = QueryRequest::new(TABLE)
            .index("SessionIdIndex")
            .key(Condition::eq("sessionId", 42i64))
            .filter(Condition::eq("userId", "u1"))
            .descending()
            .limit(1);

        let items = store.query(&request).await.unwrap();
        assert_eq!(ids(&items), vec![2]);
    }

    #[tokio::test]
    async fn test_numeric_key_matches_by_value() {
        let store = store().await;
        let request =
            QueryRequest::new(TABLE).key(Condition::eq("classifierId", AttributeValue::n("3.0")));
        let items = store.query(&request).await.unwrap();
        assert_eq!(ids(&items), vec![3]);
    }

    #[tokio::test]
    async fn test_scan_with_any_of() {
        let store = store().await;
        let mut textual = item(5, 0, "u1", 50);
        textual.insert("sessionId".to_string(), AttributeValue::s("42"));
        store.put_item(TABLE, &textual).await.unwrap();

        let request = ScanRequest::new(TABLE)
            .filter(Condition::any_of(vec![
                Condition::eq("sessionId", 42i64),
                Condition::eq("sessionId", "42"),
            ]))
            .filter(Condition::eq("userId", "u1"));
        let items = store.scan(&request).await.unwrap();
        assert_eq!(ids(&items), vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn test_put_replaces_in_place() {
        let store = store().await;
        store.put_item(TABLE, &item(1, 7, "u1", 999)).await.unwrap();

        let all = store.scan(&ScanRequest::new(TABLE)).await.unwrap();
        assert_eq!(ids(&all), vec![1, 2, 3, 4]);
        assert_eq!(all[0]["sessionId"], AttributeValue::n(7));
    }

    #[tokio::test]
    async fn test_unknown_index() {
        let store = store().await;
        let request = QueryRequest::new(TABLE)
            .index("UserIdIndex")
            .key(Condition::eq("userId", "u1"));
        assert!(matches!(
            store.query(&request).await,
            Err(StoreError::IndexNotFound { .. })
        ));
    }

    #[test]
    fn test_attribute_names_are_validated() {
        assert!(attribute_path("sessionId").is_ok());
        assert!(attribute_path("a\"); DROP TABLE kv_items; --").is_err());
        assert!(attribute_path("").is_err());
    }

    #[test]
    fn test_compile_scan_limit() {
        let request = ScanRequest::new(TABLE)
            .filter(Condition::eq("userId", "u1"))
            .limit(5);
        let (sql, binds) = compile_scan(&request).unwrap();
        assert_eq!(
            sql,
            "SELECT item FROM kv_items WHERE table_name = ? AND json_extract(item, ?) = ? ORDER BY seq ASC LIMIT ?"
        );
        assert_eq!(binds.last(), Some(&Bind::Int(5)));
    }
}
