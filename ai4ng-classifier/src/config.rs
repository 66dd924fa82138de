//! Service configuration
//!
//! Loaded once at startup from TOML (see [`ServiceConfig::load`]) and handed
//! to the resolver, locator and fetcher at construction. Nothing below the
//! config layer reads the environment.

use ai4ng_common::config::{load_toml_or_default, resolve_config_path, LoggingConfig};
use ai4ng_common::store::{KeyAttribute, KeySchema, KeyType, TableSchema};
use ai4ng_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "AI4NG_CONFIG";
/// Per-user config file name under `~/.config/ai4ng/`
pub const CONFIG_FILE_NAME: &str = "classifier.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub classifier_table: ClassifierTableConfig,
    pub file_index: FileIndexConfig,
    pub record_store: RecordStoreConfig,
    pub object_store: ObjectStoreConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5740".to_string(),
        }
    }
}

/// Classifier table and the lookup capabilities this deployment offers
///
/// An index set to `None` does not exist here; lookups that would use it go
/// straight to the next strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierTableConfig {
    pub table_name: String,
    /// Numeric primary key attribute
    pub primary_key: String,
    /// Whether by-id lookups may query the primary key directly
    pub primary_key_lookup: bool,
    /// Index partitioned by `userId`
    pub user_index: Option<String>,
    /// Index partitioned by numeric `sessionId`, sorted by `timestamp`
    pub session_index: Option<String>,
    /// Index partitioned by `sessionName`, sorted by `timestamp`
    pub session_name_index: Option<String>,
    /// Whether filtered full scans are permitted as a last resort
    pub allow_scan: bool,
}

impl Default for ClassifierTableConfig {
    fn default() -> Self {
        Self {
            table_name: "FBCSPClassifierParameters".to_string(),
            primary_key: "classifierId".to_string(),
            primary_key_lookup: true,
            user_index: Some("UserIdIndex".to_string()),
            session_index: Some("SessionIdIndex".to_string()),
            session_name_index: None,
            allow_scan: true,
        }
    }
}

impl ClassifierTableConfig {
    /// Key-value table declaration matching the configured capabilities
    pub fn table_schema(&self) -> TableSchema {
        let timestamp = || Some(KeyAttribute::new("timestamp", KeyType::N));
        let mut schema = TableSchema::new(
            &self.table_name,
            KeySchema::new(KeyAttribute::new(&self.primary_key, KeyType::N), None),
        );
        if let Some(index) = &self.user_index {
            schema = schema.with_index(
                index,
                KeySchema::new(KeyAttribute::new("userId", KeyType::S), None),
            );
        }
        if let Some(index) = &self.session_index {
            schema = schema.with_index(
                index,
                KeySchema::new(KeyAttribute::new("sessionId", KeyType::N), timestamp()),
            );
        }
        if let Some(index) = &self.session_name_index {
            schema = schema.with_index(
                index,
                KeySchema::new(KeyAttribute::new("sessionName", KeyType::S), timestamp()),
            );
        }
        schema
    }
}

/// Secondary file index describing graph artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileIndexConfig {
    pub table_name: String,
    /// Text primary key attribute (the storage path by default)
    pub primary_key: String,
    /// Index partitioned by textual `sessionId`
    pub session_index: Option<String>,
    pub allow_scan: bool,
}

impl Default for FileIndexConfig {
    fn default() -> Self {
        Self {
            table_name: "EEGClassifierGraphFiles".to_string(),
            primary_key: "path".to_string(),
            session_index: Some("SessionIdIndex".to_string()),
            allow_scan: true,
        }
    }
}

impl FileIndexConfig {
    pub fn table_schema(&self) -> TableSchema {
        let mut schema = TableSchema::new(
            &self.table_name,
            KeySchema::new(KeyAttribute::new(&self.primary_key, KeyType::S), None),
        );
        if let Some(index) = &self.session_index {
            schema = schema.with_index(
                index,
                KeySchema::new(KeyAttribute::new("sessionId", KeyType::S), None),
            );
        }
        schema
    }
}

/// Key-value store backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum RecordStoreConfig {
    /// In-process tables, optionally seeded from a typed-JSON export
    Memory { seed_file: Option<PathBuf> },
    Sqlite { path: PathBuf },
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self::Memory { seed_file: None }
    }
}

/// Object store backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ObjectStoreConfig {
    /// Local mirror of the bucket layout
    Fs { root: PathBuf },
    Http { base_url: String },
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self::Fs {
            root: PathBuf::from("./objects"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Upper bound on any single store or object-store call
    pub request_timeout_ms: u64,
    /// Artifact fetches in flight per list request
    pub fetch_concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            fetch_concurrency: 4,
        }
    }
}

impl LimitsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ServiceConfig {
    /// Resolve, load, apply environment overrides and validate
    pub fn load(cli_config: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_config, CONFIG_ENV_VAR, CONFIG_FILE_NAME);
        let mut config: ServiceConfig = load_toml_or_default(path.as_deref())?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply table-name overrides (`CLASSIFIER_TABLE`, `FILE_INDEX_TABLE`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(table) = non_empty("CLASSIFIER_TABLE") {
            info!("Classifier table overridden by environment: {}", table);
            self.classifier_table.table_name = table;
        }
        if let Some(table) = non_empty("FILE_INDEX_TABLE") {
            info!("File index table overridden by environment: {}", table);
            self.file_index.table_name = table;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.classifier_table.table_name.trim().is_empty() {
            return Err(Error::Config("classifier_table.table_name is empty".to_string()));
        }
        if self.file_index.table_name.trim().is_empty() {
            return Err(Error::Config("file_index.table_name is empty".to_string()));
        }
        if self.limits.fetch_concurrency == 0 {
            return Err(Error::Config("limits.fetch_concurrency must be at least 1".to_string()));
        }
        if self.limits.request_timeout_ms == 0 {
            return Err(Error::Config("limits.request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:5740");
        assert_eq!(config.classifier_table.table_name, "FBCSPClassifierParameters");
        assert_eq!(config.file_index.table_name, "EEGClassifierGraphFiles");
        assert_eq!(config.limits.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.limits.fetch_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [classifier_table]
            session_name_index = "SessionNameIndex"
            allow_scan = false

            [record_store]
            backend = "sqlite"
            path = "/var/lib/ai4ng/records.db"

            [object_store]
            backend = "http"
            base_url = "http://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier_table.table_name, "FBCSPClassifierParameters");
        assert_eq!(config.classifier_table.user_index.as_deref(), Some("UserIdIndex"));
        assert!(!config.classifier_table.allow_scan);
        assert_eq!(
            config.record_store,
            RecordStoreConfig::Sqlite {
                path: PathBuf::from("/var/lib/ai4ng/records.db")
            }
        );
        assert_eq!(
            config.object_store,
            ObjectStoreConfig::Http {
                base_url: "http://localhost:9000".to_string()
            }
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_table_schema_reflects_capabilities() {
        let mut table = ClassifierTableConfig::default();
        let schema = table.table_schema();
        assert!(schema.key_schema(Some("UserIdIndex")).is_ok());
        assert!(schema.key_schema(Some("SessionIdIndex")).is_ok());
        assert!(schema.key_schema(Some("SessionNameIndex")).is_err());

        table.user_index = None;
        table.session_name_index = Some("SessionNameIndex".to_string());
        let schema = table.table_schema();
        assert!(schema.key_schema(Some("UserIdIndex")).is_err());
        assert!(schema.key_schema(Some("SessionNameIndex")).is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = ServiceConfig::default();
        config.apply_overrides(|name| match name {
            "CLASSIFIER_TABLE" => Some("ClassifiersStaging".to_string()),
            "FILE_INDEX_TABLE" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.classifier_table.table_name, "ClassifiersStaging");
        assert_eq!(config.file_index.table_name, "EEGClassifierGraphFiles");
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = ServiceConfig::default();
        config.limits.fetch_concurrency = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("classifier.toml");
        std::fs::write(
            &path,
            "[server]\nbind = \"0.0.0.0:8080\"\n[limits]\nfetch_concurrency = 8\n",
        )
        .unwrap();

        let config = ServiceConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.limits.fetch_concurrency, 8);
        assert_eq!(config.limits.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("classifier.toml");
        std::fs::write(&path, "[limits\nfetch_concurrency = ").unwrap();
        assert!(matches!(ServiceConfig::load(Some(path.as_path())), Err(Error::Config(_))));
    }
}
