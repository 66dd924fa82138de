//! HTTP API handlers for ai4ng-classifier

pub mod classifiers;
pub mod error;
pub mod graphs;
pub mod health;
pub mod identity;

pub use classifiers::{get_classifier, get_classifier_by_session, list_classifiers};
pub use error::ApiError;
pub use graphs::{get_graph, get_graph_data, list_graph_data, list_graph_names, list_graphs};
pub use health::health_routes;
pub use identity::UserIdentity;
