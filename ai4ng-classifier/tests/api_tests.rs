//! Integration tests for the ai4ng-classifier HTTP API
//!
//! Routing, identity header handling and error mapping, over seeded
//! in-memory stores.

mod helpers;

use ai4ng_classifier::config::ServiceConfig;
use ai4ng_classifier::{build_router, AppState, ClassifierService};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

fn setup_app() -> axum::Router {
    let config = ServiceConfig::default();
    let records = helpers::record_store(&config);
    let objects = helpers::object_store();
    let service = ClassifierService::new(Arc::new(records), Arc::new(objects), &config);
    build_router(AppState::new(Arc::new(service)))
}

fn request_as(user: Option<&str>, uri: &str) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let response = setup_app()
        .oneshot(request_as(None, "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ai4ng-classifier");
    assert!(body["version"].is_string());
}

// =============================================================================
// Classifiers
// =============================================================================

#[tokio::test]
async fn test_list_classifiers() {
    let response = setup_app()
        .oneshot(request_as(Some("u1"), "/api/classifiers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let classifiers = body.as_array().unwrap();
    assert_eq!(classifiers.len(), 3);
    assert_eq!(classifiers[0]["classifierId"], 7);
    assert_eq!(classifiers[0]["status"], "Ready");
    assert_eq!(classifiers[0]["uploadDate"], "2023-11-14T22:13:20Z");
    assert!(classifiers[0].get("userId").is_none());
}

#[tokio::test]
async fn test_missing_identity_is_validation_error() {
    let response = setup_app()
        .oneshot(request_as(None, "/api/classifiers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_get_classifier_by_id() {
    let response = setup_app()
        .oneshot(request_as(Some("u1"), "/api/classifiers/7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sessionId"], 42);
    assert_eq!(body["parameters"]["a0"], 0.5);
    assert_eq!(body["graphs"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_foreign_classifier_is_not_found() {
    let response = setup_app()
        .oneshot(request_as(Some("u1"), "/api/classifiers/9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_numeric_classifier_id_is_bad_request() {
    let response = setup_app()
        .oneshot(request_as(Some("u1"), "/api/classifiers/seven"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_classifier_by_session_name() {
    let response = setup_app()
        .oneshot(request_as(
            Some("u1"),
            "/api/classifiers/session/Morning%20calibration",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["classifierId"], 10);
    assert_eq!(body["sessionName"], "Morning calibration");
    assert_eq!(body["graphs"][0]["data"], "s3://graphs/u1/43/DA plot.png");
}

#[tokio::test]
async fn test_graph_names_by_session_name() {
    let response = setup_app()
        .oneshot(request_as(
            Some("u1"),
            "/api/classifiers/session/Morning%20calibration/graph-names",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body, serde_json::json!(["DA plot.png"]));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let response = setup_app()
        .oneshot(request_as(Some("u1"), "/api/classifiers/session/NoSuchSession"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Graphs
// =============================================================================

#[tokio::test]
async fn test_list_graphs() {
    let response = setup_app()
        .oneshot(request_as(Some("u1"), "/api/classifiers/session/42/graphs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let graphs = body.as_array().unwrap();
    assert_eq!(graphs.len(), 2);
    assert_eq!(graphs[0]["name"], "DA plot.png");
    assert_eq!(graphs[0]["data"], helpers::PNG_BASE64);
}

#[tokio::test]
async fn test_list_graph_data_and_names() {
    let app = setup_app();

    let response = app
        .clone()
        .oneshot(request_as(Some("u1"), "/api/classifiers/session/42/graph-data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body[0]["data"]["accuracy"][0], 0.5);

    let response = app
        .oneshot(request_as(Some("u1"), "/api/classifiers/session/42/graph-names"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_get_single_graph_and_data() {
    let app = setup_app();

    let response = app
        .clone()
        .oneshot(request_as(
            Some("u1"),
            "/api/classifiers/session/42/graphs/heatmap%20(Freq%20v4)",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["name"], "heatmap (Freq v4).png");

    let response = app
        .oneshot(request_as(
            Some("u1"),
            "/api/classifiers/session/42/graph-data/DA%20plot.json",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["name"], "DA plot.json");
}

#[tokio::test]
async fn test_non_positive_session_is_bad_request() {
    let response = setup_app()
        .oneshot(request_as(Some("u1"), "/api/classifiers/session/0/graphs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
