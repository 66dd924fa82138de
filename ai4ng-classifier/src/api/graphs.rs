//! Graph artifact endpoints, all scoped to one session

use axum::{
    extract::{Path, State},
    Json,
};

use super::{ApiError, UserIdentity};
use crate::models::{Graph, GraphData, SessionRef};
use crate::AppState;

/// GET /api/classifiers/session/:session/graphs
pub async fn list_graphs(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
    Path(session): Path<String>,
) -> Result<Json<Vec<Graph>>, ApiError> {
    let session = SessionRef::parse(&session);
    Ok(Json(state.service.list_graphs(&user_id, &session).await?))
}

/// GET /api/classifiers/session/:session/graph-data
pub async fn list_graph_data(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
    Path(session): Path<String>,
) -> Result<Json<Vec<GraphData>>, ApiError> {
    let session = SessionRef::parse(&session);
    Ok(Json(state.service.list_graph_data(&user_id, &session).await?))
}

/// GET /api/classifiers/session/:session/graph-names
pub async fn list_graph_names(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
    Path(session): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let session = SessionRef::parse(&session);
    Ok(Json(state.service.list_graph_names(&user_id, &session).await?))
}

/// GET /api/classifiers/session/:session/graphs/:name
pub async fn get_graph(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
    Path((session, name)): Path<(String, String)>,
) -> Result<Json<Graph>, ApiError> {
    let session = SessionRef::parse(&session);
    Ok(Json(state.service.get_graph(&user_id, &session, &name).await?))
}

/// GET /api/classifiers/session/:session/graph-data/:name
pub async fn get_graph_data(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
    Path((session, name)): Path<(String, String)>,
) -> Result<Json<GraphData>, ApiError> {
    let session = SessionRef::parse(&session);
    Ok(Json(state.service.get_graph_data(&user_id, &session, &name).await?))
}
