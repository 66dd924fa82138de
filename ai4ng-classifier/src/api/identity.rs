//! Caller identity supplied by the upstream authorizer

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

/// Header carrying the verified user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// User id of the caller
///
/// Never rejects: a missing or unreadable header yields an empty id, which
/// the service refuses with a validation error before any store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        Ok(UserIdentity(user_id))
    }
}
