//! ai4ng-classifier - classifier read service
//!
//! Serves fitted EEG classifier parameters and their diagnostic graphs to
//! authenticated users. Identity is established upstream and arrives in the
//! `x-user-id` header.

use ai4ng_classifier::config::{ObjectStoreConfig, RecordStoreConfig};
use ai4ng_classifier::{build_router, logging, AppState, ClassifierService, ServiceConfig};
use ai4ng_common::object_store::{FsObjectStore, HttpObjectStore, ObjectStore};
use ai4ng_common::store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "ai4ng-classifier", version, about = "Classifier read service")]
struct Args {
    /// Config file (overrides AI4NG_CONFIG and ~/.config/ai4ng/classifier.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (overrides server.bind)
    #[arg(long, env = "AI4NG_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging first, so config discovery and overrides are visible
    let log_level = logging::init();

    info!(
        "Starting AI4NG Classifier Service (ai4ng-classifier) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = match ServiceConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e).context("Failed to load configuration");
        }
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if log_level.apply(&config.logging) {
        info!("Log level set to {}", config.logging.level);
    }

    info!(
        classifier_table = %config.classifier_table.table_name,
        file_index = %config.file_index.table_name,
        "Configuration resolved"
    );

    let records = match build_record_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open record store: {:#}", e);
            return Err(e);
        }
    };
    let objects = build_object_store(&config)?;

    let service = Arc::new(ClassifierService::new(records, objects, &config));
    let app = build_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("ai4ng-classifier listening on http://{}", config.server.bind);
    info!("Health check: http://{}/health", config.server.bind);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_record_store(config: &ServiceConfig) -> Result<Arc<dyn RecordStore>> {
    let schemas = vec![
        config.classifier_table.table_schema(),
        config.file_index.table_schema(),
    ];

    match &config.record_store {
        RecordStoreConfig::Memory { seed_file } => {
            let store = MemoryRecordStore::with_tables(schemas);
            match seed_file {
                Some(path) => {
                    store.seed_from_file(path)?;
                }
                None => info!("In-memory record store starts empty (no seed_file configured)"),
            }
            Ok(Arc::new(store))
        }
        RecordStoreConfig::Sqlite { path } => {
            let store = SqliteRecordStore::connect(path, schemas).await?;
            info!("✓ Connected to record store {}", path.display());
            Ok(Arc::new(store))
        }
    }
}

fn build_object_store(config: &ServiceConfig) -> Result<Arc<dyn ObjectStore>> {
    match &config.object_store {
        ObjectStoreConfig::Fs { root } => {
            info!("Serving objects from {}", root.display());
            Ok(Arc::new(FsObjectStore::new(root.clone())))
        }
        ObjectStoreConfig::Http { base_url } => {
            let store = HttpObjectStore::new(base_url, config.limits.request_timeout())?;
            info!("Serving objects from {}", base_url);
            Ok(Arc::new(store))
        }
    }
}
