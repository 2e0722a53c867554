//! Listing search and per-viewer projections.

use geo::Point;
use shared::pagination::{Page, PageRequest};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::{
    Listing, ListingSummary, Member, MembershipStatus, ParticipationState, RecruitmentFilter,
};
use crate::services::proximity::{haversine_km, within_radius};
use crate::services::roster::build_roster;
use crate::store::{complete, ListingStore, MemberDirectory, MembershipStore, PartyStore};

/// Search parameters for the listing feed.
#[derive(Debug, Clone, Validate)]
pub struct SearchCriteria {
    pub filter: RecruitmentFilter,
    pub page: PageRequest,
    #[validate(custom(function = "shared::validation::validate_radius_km"))]
    pub radius_km: f64,
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
    #[validate(length(max = 100, message = "Keyword must be at most 100 characters"))]
    pub keyword: Option<String>,
}

impl SearchCriteria {
    fn origin(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Read side of listings.
pub struct ListingQuery<S: PartyStore> {
    store: Arc<S>,
    members: Arc<dyn MemberDirectory>,
}

impl<S: PartyStore> Clone for ListingQuery<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            members: self.members.clone(),
        }
    }
}

impl<S: PartyStore> ListingQuery<S> {
    pub fn new(store: Arc<S>, members: Arc<dyn MemberDirectory>) -> Self {
        Self { store, members }
    }

    /// One page of listings within the radius of the given point.
    ///
    /// The page is fetched first and then filtered by distance, so `count` is
    /// the number of rows of this page that fall within the radius.
    pub async fn search(
        &self,
        criteria: SearchCriteria,
        viewer_id: Option<Uuid>,
    ) -> Result<Page<ListingSummary>, DomainError> {
        criteria.validate()?;

        let viewer = match viewer_id {
            Some(id) => {
                let member = self
                    .members
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Member not found"))?;
                if member.is_blocked() {
                    return Err(DomainError::forbidden("Blocked members cannot view parties"));
                }
                Some(member)
            }
            None => None,
        };

        let mut work = self.store.begin().await?;
        let result: Result<Vec<ListingSummary>, DomainError> = async {
            let candidates = match criteria.keyword() {
                Some(keyword) => {
                    work.find_listing_page_by_keyword(criteria.filter, criteria.page, keyword)
                        .await?
                }
                None => work.find_listing_page(criteria.filter, criteria.page).await?,
            };

            let origin = criteria.origin();
            let mut items = Vec::with_capacity(candidates.len());
            for listing in candidates {
                let Some(distance) = within_radius(origin, listing.location(), criteria.radius_km)
                else {
                    continue;
                };
                let summary = self
                    .project(&mut work, listing, viewer.as_ref())
                    .await?
                    .with_distance(distance);
                items.push(summary);
            }
            Ok(items)
        }
        .await;
        let items = complete(work, result).await?;

        tracing::debug!(
            page = criteria.page.page(),
            count = items.len(),
            radius_km = criteria.radius_km,
            "Party search"
        );
        Ok(Page::new(items, criteria.page.page()))
    }

    /// A single listing with its roster and the viewer's participation state.
    ///
    /// Distance is attached when the viewer has a known location.
    pub async fn detail(
        &self,
        listing_id: Uuid,
        viewer: &Member,
    ) -> Result<ListingSummary, DomainError> {
        if viewer.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot view parties"));
        }

        let mut work = self.store.begin().await?;
        let result: Result<ListingSummary, DomainError> = async {
            let listing = work
                .find_listing(listing_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Party not found"))?;
            let location = listing.location();
            let summary = self.project(&mut work, listing, Some(viewer)).await?;
            Ok(match (viewer.longitude, viewer.latitude) {
                (Some(lon), Some(lat)) => {
                    summary.with_distance(haversine_km(Point::new(lon, lat), location))
                }
                _ => summary,
            })
        }
        .await;
        complete(work, result).await
    }

    /// Listings hosted by the member, newest first.
    pub async fn hosted(&self, member: &Member) -> Result<Vec<ListingSummary>, DomainError> {
        if member.is_blocked() {
            return Err(DomainError::forbidden("Blocked members cannot view parties"));
        }

        let mut work = self.store.begin().await?;
        let result: Result<Vec<ListingSummary>, DomainError> = async {
            let ids: Vec<Uuid> = work
                .find_by_member(member.id)
                .await?
                .into_iter()
                .filter(|m| m.status == MembershipStatus::Host)
                .map(|m| m.listing_id)
                .collect();
            let mut listings = work.find_listings_by_ids(&ids).await?;
            listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let mut items = Vec::with_capacity(listings.len());
            for listing in listings {
                let roster = build_roster(&mut work, self.members.as_ref(), listing.id).await?;
                items.push(
                    ListingSummary::new(listing, roster).with_state(ParticipationState::Accepted),
                );
            }
            Ok(items)
        }
        .await;
        complete(work, result).await
    }

    async fn project(
        &self,
        work: &mut S::Work,
        listing: Listing,
        viewer: Option<&Member>,
    ) -> Result<ListingSummary, DomainError> {
        let roster = build_roster(work, self.members.as_ref(), listing.id).await?;
        let state = match viewer {
            Some(viewer) => Some(ParticipationState::of(
                work.find_membership_by_listing_and_member(listing.id, viewer.id)
                    .await?
                    .map(|m| m.status),
            )),
            None => None,
        };
        let summary = ListingSummary::new(listing, roster);
        Ok(match state {
            Some(state) => summary.with_state(state),
            None => summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{create_request, Fixture};

    fn criteria(radius_km: f64) -> SearchCriteria {
        SearchCriteria {
            filter: RecruitmentFilter::All,
            page: PageRequest::of(0),
            radius_km,
            latitude: 0.0,
            longitude: 0.0,
            keyword: None,
        }
    }

    async fn party_at(fx: &Fixture, host: &Member, title: &str, lat: f64, lon: f64) -> Uuid {
        let mut request = create_request(title, 4);
        request.latitude = lat;
        request.longitude = lon;
        fx.lifecycle.create(request, host).await.unwrap().party_id
    }

    #[tokio::test]
    async fn test_radius_filter_around_eleven_km() {
        let fx = Fixture::new();
        let host = fx.member("host").await;
        party_at(&fx, &host, "Equator meetup", 0.0, 0.1).await;

        let page = fx.query.search(criteria(10.0), None).await.unwrap();
        assert_eq!(page.count, 0);
        assert!(page.items.is_empty());

        let page = fx.query.search(criteria(12.0), None).await.unwrap();
        assert_eq!(page.count, 1);
        let distance = page.items[0].distance_km.unwrap();
        assert!((distance - 11.12).abs() < 0.05);
        assert!(page.items[0].state.is_none());
    }

    #[tokio::test]
    async fn test_count_is_filtered_page_size() {
        let fx = Fixture::new();
        let host = fx.member("host").await;
        for i in 0..12 {
            let lon = if i % 2 == 0 { 0.01 } else { 1.0 };
            party_at(&fx, &host, &format!("Party {}", i), 0.0, lon).await;
        }

        let first = fx.query.search(criteria(5.0), None).await.unwrap();
        assert_eq!(first.page, 0);
        // 10 fetched, half nearby
        assert_eq!(first.count, 5);

        let mut next = criteria(5.0);
        next.page = PageRequest::of(1);
        let second = fx.query.search(next, None).await.unwrap();
        assert_eq!(second.page, 1);
        assert_eq!(second.count, 1);
    }

    #[tokio::test]
    async fn test_newest_first_and_recruitment_filter() {
        let fx = Fixture::new();
        let host = fx.member("host").await;
        let older = party_at(&fx, &host, "Older", 0.0, 0.0).await;
        let full = {
            let mut request = create_request("Solo", 1);
            request.latitude = 0.0;
            request.longitude = 0.0;
            fx.lifecycle.create(request, &host).await.unwrap().party_id
        };

        let all = fx.query.search(criteria(1.0), None).await.unwrap();
        let ids: Vec<Uuid> = all.items.iter().map(|s| s.party_id).collect();
        assert_eq!(ids, vec![full, older]);

        let mut open = criteria(1.0);
        open.filter = RecruitmentFilter::Open;
        let page = fx.query.search(open, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].party_id, older);

        let mut closed = criteria(1.0);
        closed.filter = RecruitmentFilter::Closed;
        let page = fx.query.search(closed, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].party_id, full);
    }

    #[tokio::test]
    async fn test_keyword_search() {
        let fx = Fixture::new();
        let host = fx.member("host").await;
        let soju = party_at(&fx, &host, "Soju tasting", 0.0, 0.0).await;
        party_at(&fx, &host, "Board games", 0.0, 0.0).await;

        let mut search = criteria(1.0);
        search.keyword = Some("  soju ".into());
        let page = fx.query.search(search, None).await.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0].party_id, soju);

        let mut blank = criteria(1.0);
        blank.keyword = Some("   ".into());
        assert_eq!(fx.query.search(blank, None).await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_viewer_states() {
        let fx = Fixture::new();
        let host = fx.member("host").await;
        let viewer = fx.member("viewer").await;
        let awaiting = party_at(&fx, &host, "Awaiting", 0.0, 0.0).await;
        let rejected = party_at(&fx, &host, "Rejected", 0.0, 0.0).await;
        let accepted = party_at(&fx, &host, "Accepted", 0.0, 0.0).await;
        let untouched = party_at(&fx, &host, "Untouched", 0.0, 0.0).await;
        let own = party_at(&fx, &viewer, "Own", 0.0, 0.0).await;

        for party in [awaiting, rejected, accepted] {
            fx.participation
                .request_or_cancel(party, &viewer)
                .await
                .unwrap();
        }
        fx.participation
            .reject(fx.membership_of(rejected, viewer.id).await)
            .await
            .unwrap();
        fx.participation
            .approve(fx.membership_of(accepted, viewer.id).await)
            .await
            .unwrap();

        let page = fx.query.search(criteria(1.0), Some(viewer.id)).await.unwrap();
        let code = |id: Uuid| {
            page.items
                .iter()
                .find(|s| s.party_id == id)
                .and_then(|s| s.state)
                .map(|s| s.code())
        };
        assert_eq!(code(untouched), Some(0));
        assert_eq!(code(accepted), Some(1));
        assert_eq!(code(own), Some(1));
        assert_eq!(code(awaiting), Some(2));
        assert_eq!(code(rejected), Some(3));

        let accepted_summary = page.items.iter().find(|s| s.party_id == accepted).unwrap();
        assert_eq!(accepted_summary.participants.len(), 2);
        assert!(accepted_summary.participants[0].host);
        assert_eq!(accepted_summary.participants[1].member_id, viewer.id);
    }

    #[tokio::test]
    async fn test_blocked_or_unknown_viewer() {
        let fx = Fixture::new();
        let blocked = fx.blocked_member("troll").await;

        let result = fx.query.search(criteria(1.0), Some(blocked.id)).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));

        let result = fx.query.search(criteria(1.0), Some(Uuid::new_v4())).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blocked_viewer_fails_before_reading_listings() {
        let fx = Fixture::new();
        let blocked = fx.blocked_member("troll").await;
        fx.store.set_unavailable(true);

        let result = fx.query.search(criteria(1.0), Some(blocked.id)).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_invalid_criteria() {
        let fx = Fixture::new();
        let mut bad = criteria(1.0);
        bad.latitude = 120.0;
        let result = fx.query.search(bad, None).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let result = fx.query.search(criteria(-3.0), None).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_detail_and_hosted() {
        let fx = Fixture::new();
        let host = fx.member("host").await;
        let viewer = fx.member("viewer").await;
        let party = party_at(&fx, &host, "Detail", 0.0, 0.1).await;

        let detail = fx.query.detail(party, &viewer).await.unwrap();
        assert_eq!(detail.state, Some(ParticipationState::None));
        assert_eq!(detail.participants.len(), 1);
        assert!(detail.distance_km.is_none());

        let mut located = viewer.clone();
        located.latitude = Some(0.0);
        located.longitude = Some(0.0);
        let detail = fx.query.detail(party, &located).await.unwrap();
        assert!((detail.distance_km.unwrap() - 11.12).abs() < 0.05);

        let missing = fx.query.detail(Uuid::new_v4(), &viewer).await;
        assert!(matches!(missing, Err(DomainError::NotFound(_))));

        let hosted = fx.query.hosted(&host).await.unwrap();
        assert_eq!(hosted.len(), 1);
        assert_eq!(hosted[0].party_id, party);
        assert_eq!(hosted[0].state, Some(ParticipationState::Accepted));
        assert!(fx.query.hosted(&viewer).await.unwrap().is_empty());
    }
}
