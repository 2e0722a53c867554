//! The caller's own parties and requests.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use domain::models::{ApprovalRequest, ListingSummary, ParticipationFilter};
use domain::services::PurgeReport;
use domain::store::PartyStore;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentMember;

#[derive(Debug, Deserialize)]
pub struct ParticipationsQuery {
    /// 0 all, 1 accepted, 2 awaiting.
    #[serde(default)]
    pub status: u8,
}

/// Parties the caller joined or asked to join.
///
/// GET /api/v1/me/participations
pub async fn participations<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    query: Result<Query<ParticipationsQuery>, QueryRejection>,
) -> Result<Json<Vec<ListingSummary>>, ApiError> {
    let Query(query) = query?;
    let filter = ParticipationFilter::try_from(query.status)?;
    let items = state.participation.participations(&member, filter).await?;
    Ok(Json(items))
}

/// Pending requests on the caller's parties.
///
/// GET /api/v1/me/approval-requests
pub async fn approval_requests<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
) -> Result<Json<Vec<ApprovalRequest>>, ApiError> {
    Ok(Json(state.participation.approval_requests(&member).await?))
}

/// GET /api/v1/me/hosted-parties
pub async fn hosted_parties<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
) -> Result<Json<Vec<ListingSummary>>, ApiError> {
    Ok(Json(state.query.hosted(&member).await?))
}

/// Withdraws the caller from every party ahead of account removal.
///
/// Hosted parties are retired with their channels and accepted slots are
/// given back.
///
/// DELETE /api/v1/me/parties
pub async fn leave_all_parties<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
) -> Result<Json<PurgeReport>, ApiError> {
    let report = state.lifecycle.purge_member(member.id).await?;
    Ok(Json(report))
}
