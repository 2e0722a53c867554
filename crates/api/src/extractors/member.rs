//! Extractors for the member attached by the auth middleware.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::Member;

use crate::error::ApiError;
use crate::middleware::member_auth::AuthenticatedMember;

/// The authenticated member. Rejects with 401 when the route was reached
/// without member authentication.
#[derive(Debug, Clone)]
pub struct CurrentMember(pub Member);

#[async_trait]
impl<St: Send + Sync> FromRequestParts<St> for CurrentMember {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedMember>()
            .map(|auth| CurrentMember(auth.0.clone()))
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// The viewing member on routes that also serve anonymous callers.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Member>);

#[async_trait]
impl<St: Send + Sync> FromRequestParts<St> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            parts
                .extensions
                .get::<AuthenticatedMember>()
                .map(|auth| auth.0.clone()),
        ))
    }
}
