//! ai4ng-classifier library - classifier read service
//!
//! Resolves classifier records for the calling user from a multi-index
//! key-value store, decodes them tolerantly, and serves their diagnostic
//! graph artifacts from the object store.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod accessors;
pub mod api;
pub mod config;
pub mod deadline;
pub mod fetcher;
pub mod locator;
pub mod logging;
pub mod lookup;
pub mod mapper;
pub mod models;
pub mod resolver;
pub mod service;
pub mod validate;

pub use config::ServiceConfig;
pub use service::ClassifierService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ClassifierService>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<ClassifierService>) -> Self {
        Self {
            service,
            startup_time: ai4ng_common::time::now(),
        }
    }
}

/// Build application router
///
/// Every `/api` route takes the caller identity from the `x-user-id` header.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let classifiers = Router::new()
        .route("/api/classifiers", get(api::list_classifiers))
        .route("/api/classifiers/:classifier_id", get(api::get_classifier))
        .route(
            "/api/classifiers/session/:session",
            get(api::get_classifier_by_session),
        );

    let graphs = Router::new()
        .route("/api/classifiers/session/:session/graphs", get(api::list_graphs))
        .route(
            "/api/classifiers/session/:session/graph-data",
            get(api::list_graph_data),
        )
        .route(
            "/api/classifiers/session/:session/graph-names",
            get(api::list_graph_names),
        )
        .route(
            "/api/classifiers/session/:session/graphs/:name",
            get(api::get_graph),
        )
        .route(
            "/api/classifiers/session/:session/graph-data/:name",
            get(api::get_graph_data),
        );

    Router::new()
        .merge(classifiers)
        .merge(graphs)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
