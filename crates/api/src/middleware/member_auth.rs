//! Bearer-token member authentication.
//!
//! Access tokens are issued by the login service and carry the member's
//! external id as subject. The middleware verifies the token, resolves the
//! member through the [`MemberDirectory`](domain::store::MemberDirectory) and
//! stores it in the request extensions.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::Member;
use domain::store::PartyStore;

use crate::app::AppState;
use crate::error::ApiError;

/// The member resolved from the request's access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedMember(pub Member);

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies `token` and looks up its member. `Ok(None)` means the token is
/// valid but names no known member.
async fn resolve<S: PartyStore>(
    state: &AppState<S>,
    token: &str,
) -> Result<Option<Member>, ApiError> {
    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    Ok(state.members.find_by_external_id(&claims.sub).await?)
}

/// Rejects the request with 401 unless it carries a valid token for a known
/// member.
pub async fn require_member_auth<S: PartyStore>(
    State(state): State<AppState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&req) else {
        return ApiError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    match resolve(&state, token).await {
        Ok(Some(member)) => {
            req.extensions_mut().insert(AuthenticatedMember(member));
            next.run(req).await
        }
        Ok(None) => ApiError::Unauthorized("Unknown member".to_string()).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Attaches the member when a valid token is present and lets every request
/// through. Directory failures still fail the request.
pub async fn optional_member_auth<S: PartyStore>(
    State(state): State<AppState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req) {
        match resolve(&state, token).await {
            Ok(Some(member)) => {
                req.extensions_mut().insert(AuthenticatedMember(member));
            }
            Ok(None) | Err(ApiError::Unauthorized(_)) => {}
            Err(err) => return err.into_response(),
        }
    }

    next.run(req).await
}
