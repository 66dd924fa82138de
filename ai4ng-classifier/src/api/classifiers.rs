//! Classifier endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use super::{ApiError, UserIdentity};
use crate::models::{Classifier, SessionRef};
use crate::AppState;

/// GET /api/classifiers
///
/// Every classifier owned by the caller.
pub async fn list_classifiers(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
) -> Result<Json<Vec<Classifier>>, ApiError> {
    let classifiers = state.service.list_classifiers(&user_id).await?;
    Ok(Json(classifiers))
}

/// GET /api/classifiers/:classifier_id
pub async fn get_classifier(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
    Path(classifier_id): Path<String>,
) -> Result<Json<Classifier>, ApiError> {
    let classifier_id = classifier_id.trim().parse::<i64>().map_err(|_| {
        ApiError::BadRequest(format!("classifier id must be an integer, got {}", classifier_id))
    })?;
    let classifier = state.service.get_classifier(&user_id, classifier_id).await?;
    Ok(Json(classifier))
}

/// GET /api/classifiers/session/:session
///
/// `session` is a numeric session id or a session name.
pub async fn get_classifier_by_session(
    State(state): State<AppState>,
    UserIdentity(user_id): UserIdentity,
    Path(session): Path<String>,
) -> Result<Json<Classifier>, ApiError> {
    let session = SessionRef::parse(&session);
    let classifier = state
        .service
        .get_classifier_by_session(&user_id, &session)
        .await?;
    Ok(Json(classifier))
}
