//! Party listing endpoint handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use domain::models::{
    CreateListingRequest, CreateListingResponse, JoinOutcome, Listing, ListingSummary,
    RecruitmentFilter, UpdateListingRequest,
};
use domain::services::SearchCriteria;
use domain::store::PartyStore;
use serde::{Deserialize, Serialize};
use shared::pagination::{Page, PageRequest};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentMember, Viewer};

/// Query parameters of the party feed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Zero-based page index.
    #[serde(default)]
    pub page: u32,
    /// 0 all, 1 open, 2 closed.
    #[serde(default)]
    pub status: u8,
    /// Search radius in kilometers.
    pub radius: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub keyword: Option<String>,
}

impl SearchQuery {
    fn into_criteria(self) -> Result<SearchCriteria, ApiError> {
        Ok(SearchCriteria {
            filter: RecruitmentFilter::try_from(self.status)?,
            page: PageRequest::of(self.page),
            radius_km: self.radius,
            latitude: self.latitude,
            longitude: self.longitude,
            keyword: self.keyword,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub outcome: JoinOutcome,
}

/// Search parties near a point.
///
/// GET /api/v1/parties
pub async fn search_parties<S: PartyStore>(
    State(state): State<AppState<S>>,
    Viewer(viewer): Viewer,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Page<ListingSummary>>, ApiError> {
    let Query(query) = query?;
    let criteria = query.into_criteria()?;

    let page = state
        .query
        .search(criteria, viewer.map(|member| member.id))
        .await?;
    Ok(Json(page))
}

/// Create a party hosted by the caller.
///
/// POST /api/v1/parties
pub async fn create_party<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    body: Result<Json<CreateListingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateListingResponse>), ApiError> {
    let Json(request) = body?;
    let created = state.lifecycle.create(request, &member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// A party with its roster and the caller's participation state.
///
/// GET /api/v1/parties/:party_id
pub async fn get_party<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    Path(party_id): Path<Uuid>,
) -> Result<Json<ListingSummary>, ApiError> {
    let summary = state.query.detail(party_id, &member).await?;
    Ok(Json(summary))
}

/// Partially update a party. Host only.
///
/// PATCH /api/v1/parties/:party_id
pub async fn update_party<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    Path(party_id): Path<Uuid>,
    body: Result<Json<UpdateListingRequest>, JsonRejection>,
) -> Result<Json<Listing>, ApiError> {
    let Json(request) = body?;
    let listing = state.lifecycle.update(party_id, request, &member).await?;
    Ok(Json(listing))
}

/// Delete a party. Host only.
///
/// DELETE /api/v1/parties/:party_id
pub async fn delete_party<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    Path(party_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.lifecycle.delete(party_id, &member).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request to join, or withdraw from, a party.
///
/// POST /api/v1/parties/:party_id/participation
pub async fn toggle_participation<S: PartyStore>(
    State(state): State<AppState<S>>,
    CurrentMember(member): CurrentMember,
    Path(party_id): Path<Uuid>,
) -> Result<Json<JoinResponse>, ApiError> {
    let outcome = state
        .participation
        .request_or_cancel(party_id, &member)
        .await?;
    Ok(Json(JoinResponse { outcome }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(status: u8) -> SearchQuery {
        SearchQuery {
            page: 2,
            status,
            radius: 5.0,
            latitude: 37.5,
            longitude: 127.0,
            keyword: Some("board games".into()),
        }
    }

    #[test]
    fn test_search_query_maps_to_criteria() {
        let criteria = query(1).into_criteria().unwrap();
        assert_eq!(criteria.filter, RecruitmentFilter::Open);
        assert_eq!(criteria.page.page(), 2);
        assert_eq!(criteria.page.offset(), 20);
        assert_eq!(criteria.keyword.as_deref(), Some("board games"));
    }

    #[test]
    fn test_unknown_status_code_is_rejected() {
        assert!(matches!(
            query(3).into_criteria(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_search_query_defaults() {
        let parsed: SearchQuery =
            serde_json::from_str(r#"{"radius": 3, "latitude": 37.5, "longitude": 127.0}"#)
                .unwrap();
        assert_eq!(parsed.page, 0);
        assert_eq!(parsed.status, 0);
        assert!(parsed.keyword.is_none());
    }
}
