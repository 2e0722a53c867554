//! Host decisions on participation requests.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{ApprovalOutcome, Member};
use domain::store::PartyStore;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentMember;

fn ensure_not_blocked(member: &Member) -> Result<(), ApiError> {
    if member.is_blocked() {
        return Err(ApiError::Forbidden(
            "Blocked members cannot decide on participation requests".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub outcome: ApprovalOutcome,
}

/// Accept an awaiting request. A full party answers `FULL` with 200.
///
/// POST /api/v1/participations/:membership_id/approve
pub async fn approve<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    Path(membership_id): Path<Uuid>,
) -> Result<Json<ApprovalResponse>, ApiError> {
    ensure_not_blocked(&member)?;
    state
        .participation
        .ensure_host_of_membership(membership_id, member.id)
        .await?;
    let outcome = state.participation.approve(membership_id).await?;
    Ok(Json(ApprovalResponse { outcome }))
}

/// Decline an awaiting request.
///
/// POST /api/v1/participations/:membership_id/reject
pub async fn reject<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    Path(membership_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ensure_not_blocked(&member)?;
    state
        .participation
        .ensure_host_of_membership(membership_id, member.id)
        .await?;
    state.participation.reject(membership_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
