//! Shared setup for service tests.

use chrono::{Duration, Utc};
use fake::faker::name::en::Name;
use fake::Fake;
use std::sync::Arc;
use uuid::Uuid;

use crate::memory::{InMemoryChannelService, InMemoryMemberDirectory, InMemoryPartyStore};
use crate::models::{CreateListingRequest, Member, MemberAuthority, UpdateListingRequest};
use crate::services::{ListingLifecycle, ListingQuery, ParticipationService};

pub fn create_request(title: &str, total_count: i32) -> CreateListingRequest {
    CreateListingRequest {
        title: title.to_string(),
        content: "Bring snacks".to_string(),
        place_name: Some("Seongsu".to_string()),
        scheduled_at: Utc::now() + Duration::days(1),
        total_count,
        latitude: 37.5446,
        longitude: 127.0559,
        image: None,
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryPartyStore>,
    pub members: Arc<InMemoryMemberDirectory>,
    pub channels: Arc<InMemoryChannelService>,
    pub participation: ParticipationService<InMemoryPartyStore>,
    pub lifecycle: ListingLifecycle<InMemoryPartyStore>,
    pub query: ListingQuery<InMemoryPartyStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryPartyStore::new());
        let members = Arc::new(InMemoryMemberDirectory::new());
        let channels = Arc::new(InMemoryChannelService::new());
        Self {
            participation: ParticipationService::new(store.clone(), members.clone()),
            lifecycle: ListingLifecycle::new(store.clone(), channels.clone()),
            query: ListingQuery::new(store.clone(), members.clone()),
            store,
            members,
            channels,
        }
    }

    async fn add_member(&self, tag: &str, authority: MemberAuthority) -> Member {
        let display_name: String = Name().fake();
        let member = Member {
            id: Uuid::new_v4(),
            external_id: format!("kakao_{}_{}", tag, Uuid::new_v4().simple()),
            display_name,
            profile_image: None,
            authority,
            latitude: None,
            longitude: None,
        };
        self.members.insert(member.clone()).await;
        member
    }

    pub async fn member(&self, tag: &str) -> Member {
        self.add_member(tag, MemberAuthority::User).await
    }

    pub async fn blocked_member(&self, tag: &str) -> Member {
        self.add_member(tag, MemberAuthority::Blocked).await
    }

    /// Creates a listing hosted by `host` and returns its id.
    pub async fn party(&self, host: &Member, total_count: i32) -> Uuid {
        self.lifecycle
            .create(create_request("Weekend hangout", total_count), host)
            .await
            .unwrap()
            .party_id
    }

    /// Id of the active membership of `member_id` in the listing.
    pub async fn membership_of(&self, listing_id: Uuid, member_id: Uuid) -> Uuid {
        self.store
            .memberships_of_listing(listing_id)
            .await
            .into_iter()
            .find(|m| m.member_id == member_id && !m.is_deleted())
            .map(|m| m.id)
            .unwrap()
    }

    pub async fn close_recruitment(&self, listing_id: Uuid, host: &Member) {
        let request = UpdateListingRequest {
            recruitment_closed: Some(true),
            ..Default::default()
        };
        self.lifecycle.update(listing_id, request, host).await.unwrap();
    }
}
