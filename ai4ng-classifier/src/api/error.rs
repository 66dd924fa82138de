//! Error responses
//!
//! Maps the service error kinds onto status codes. Unexpected failures are
//! logged in full and answered with a generic message.

use ai4ng_common::Error;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path parameter (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Service(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::Service(Error::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            ApiError::Service(Error::NotFound(what)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
            ),
            ApiError::Service(Error::DependencyUnavailable(msg)) => {
                error!("Backing service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DEPENDENCY_UNAVAILABLE",
                    "A backing service is temporarily unavailable, retry later".to_string(),
                )
            }
            ApiError::Service(err @ (Error::Unexpected(_) | Error::Config(_))) => {
                error!("Unexpected error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNEXPECTED_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_maps_to_400() {
        let response = ApiError::from(Error::validation("user id is required")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "user id is required");
    }

    #[tokio::test]
    async fn test_unavailable_maps_to_503_with_retry_after() {
        let response = ApiError::from(Error::unavailable("throttled")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "DEPENDENCY_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_unexpected_hides_details() {
        let response =
            ApiError::from(Error::unexpected("sqlite says: disk I/O error")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNEXPECTED_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().contains("sqlite"));
    }
}
