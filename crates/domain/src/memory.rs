//! In-memory implementations of the storage and collaborator ports.
//!
//! Used for development and testing. A unit of work holds the store lock for
//! its whole lifetime and writes a working copy back on commit, so units of
//! work are fully serialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::pagination::PageRequest;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{
    ConversationChannel, Listing, Member, Membership, MembershipStatus, RecruitmentFilter,
    CHANNEL_CREATED_MESSAGE,
};
use crate::store::{
    ChannelService, ListingStore, MemberDirectory, MembershipStore, PartyStore, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct PartyState {
    listings: HashMap<Uuid, Listing>,
    memberships: HashMap<Uuid, Membership>,
}

impl PartyState {
    fn active_listings(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values().filter(|l| !l.is_deleted())
    }

    fn active_memberships(&self) -> impl Iterator<Item = &Membership> {
        self.memberships.values().filter(|m| !m.is_deleted())
    }

    fn page(&self, filter: RecruitmentFilter, page: PageRequest, keyword: Option<&str>) -> Vec<Listing> {
        let keyword = keyword.map(|k| k.to_lowercase());
        let mut rows: Vec<Listing> = self
            .active_listings()
            .filter(|l| match filter.recruitment_open() {
                Some(open) => l.recruitment_open == open,
                None => true,
            })
            .filter(|l| match &keyword {
                Some(k) => {
                    l.title.to_lowercase().contains(k)
                        || l.content.to_lowercase().contains(k)
                        || l
                            .place_name
                            .as_deref()
                            .map(|p| p.to_lowercase().contains(k))
                            .unwrap_or(false)
                }
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect()
    }
}

/// In-memory listing and membership store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPartyStore {
    state: Arc<Mutex<PartyState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPartyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `begin` fail with `Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of a listing, including soft-deleted ones.
    pub async fn listing(&self, id: Uuid) -> Option<Listing> {
        self.state.lock().await.listings.get(&id).cloned()
    }

    /// Snapshot of a membership, including soft-deleted ones.
    pub async fn membership(&self, id: Uuid) -> Option<Membership> {
        self.state.lock().await.memberships.get(&id).cloned()
    }

    /// Every membership ever recorded for a listing, including soft-deleted ones.
    pub async fn memberships_of_listing(&self, listing_id: Uuid) -> Vec<Membership> {
        let state = self.state.lock().await;
        let mut rows: Vec<Membership> = state
            .memberships
            .values()
            .filter(|m| m.listing_id == listing_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        rows
    }
}

#[async_trait]
impl PartyStore for InMemoryPartyStore {
    type Work = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Work, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable(
                "In-memory store marked unavailable".into(),
            ));
        }
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryUnitOfWork { guard, working })
    }

    async fn ping(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable(
                "In-memory store marked unavailable".into(),
            ));
        }
        Ok(())
    }
}

/// Unit of work over [`InMemoryPartyStore`].
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<PartyState>,
    working: PartyState,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(mut self) -> Result<(), DomainError> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl ListingStore for InMemoryUnitOfWork {
    async fn insert_listing(&mut self, listing: &Listing) -> Result<(), DomainError> {
        if self.working.listings.contains_key(&listing.id) {
            return Err(DomainError::InvalidState("Listing already exists".into()));
        }
        self.working.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn find_listing(&mut self, id: Uuid) -> Result<Option<Listing>, DomainError> {
        Ok(self
            .working
            .listings
            .get(&id)
            .filter(|l| !l.is_deleted())
            .cloned())
    }

    async fn find_listing_for_update(&mut self, id: Uuid) -> Result<Option<Listing>, DomainError> {
        self.find_listing(id).await
    }

    async fn find_listings_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Listing>, DomainError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.listings.get(id))
            .filter(|l| !l.is_deleted())
            .cloned()
            .collect())
    }

    async fn update_listing(&mut self, listing: &Listing) -> Result<(), DomainError> {
        match self.working.listings.get_mut(&listing.id) {
            Some(existing) if !existing.is_deleted() => {
                *existing = listing.clone();
                Ok(())
            }
            _ => Err(DomainError::not_found("Party not found")),
        }
    }

    async fn find_listing_page(
        &mut self,
        filter: RecruitmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Listing>, DomainError> {
        Ok(self.working.page(filter, page, None))
    }

    async fn find_listing_page_by_keyword(
        &mut self,
        filter: RecruitmentFilter,
        page: PageRequest,
        keyword: &str,
    ) -> Result<Vec<Listing>, DomainError> {
        Ok(self.working.page(filter, page, Some(keyword)))
    }

    async fn find_listings_scheduled_before(
        &mut self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, DomainError> {
        let mut rows: Vec<Listing> = self
            .working
            .active_listings()
            .filter(|l| l.scheduled_at < cutoff)
            .cloned()
            .collect();
        rows.sort_by_key(|l| l.scheduled_at);
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn soft_delete_listing(&mut self, id: Uuid) -> Result<bool, DomainError> {
        match self.working.listings.get_mut(&id) {
            Some(listing) if !listing.is_deleted() => {
                listing.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl MembershipStore for InMemoryUnitOfWork {
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        let duplicate = self.working.active_memberships().any(|m| {
            m.listing_id == membership.listing_id && m.member_id == membership.member_id
        });
        if duplicate {
            return Err(DomainError::InvalidState(
                "Member already has an active membership for this party".into(),
            ));
        }
        self.working
            .memberships
            .insert(membership.id, membership.clone());
        Ok(())
    }

    async fn find_membership(&mut self, id: Uuid) -> Result<Option<Membership>, DomainError> {
        Ok(self
            .working
            .memberships
            .get(&id)
            .filter(|m| !m.is_deleted())
            .cloned())
    }

    async fn find_membership_by_listing_and_member(
        &mut self,
        listing_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(self
            .working
            .active_memberships()
            .find(|m| m.listing_id == listing_id && m.member_id == member_id)
            .cloned())
    }

    async fn find_active_by_listing(
        &mut self,
        listing_id: Uuid,
    ) -> Result<Vec<Membership>, DomainError> {
        let mut rows: Vec<Membership> = self
            .working
            .active_memberships()
            .filter(|m| m.listing_id == listing_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn find_host_by_listing(
        &mut self,
        listing_id: Uuid,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(self
            .working
            .active_memberships()
            .find(|m| m.listing_id == listing_id && m.status == MembershipStatus::Host)
            .cloned())
    }

    async fn find_by_member(&mut self, member_id: Uuid) -> Result<Vec<Membership>, DomainError> {
        let mut rows: Vec<Membership> = self
            .working
            .active_memberships()
            .filter(|m| m.member_id == member_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update_membership_status(
        &mut self,
        id: Uuid,
        status: MembershipStatus,
    ) -> Result<(), DomainError> {
        match self.working.memberships.get_mut(&id) {
            Some(membership) if !membership.is_deleted() => {
                membership.status = status;
                membership.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::not_found("Membership not found")),
        }
    }

    async fn soft_delete_membership(&mut self, id: Uuid) -> Result<(), DomainError> {
        if let Some(membership) = self.working.memberships.get_mut(&id) {
            if !membership.is_deleted() {
                membership.deleted_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn soft_delete_by_listing(&mut self, listing_id: Uuid) -> Result<u64, DomainError> {
        let now = Utc::now();
        let mut count = 0;
        for membership in self.working.memberships.values_mut() {
            if membership.listing_id == listing_id && !membership.is_deleted() {
                membership.deleted_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn soft_delete_by_member(&mut self, member_id: Uuid) -> Result<u64, DomainError> {
        let now = Utc::now();
        let mut count = 0;
        for membership in self.working.memberships.values_mut() {
            if membership.member_id == member_id && !membership.is_deleted() {
                membership.deleted_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }
}

/// In-memory member directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemberDirectory {
    members: Arc<RwLock<HashMap<Uuid, Member>>>,
}

impl InMemoryMemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a member.
    pub async fn insert(&self, member: Member) {
        self.members.write().await.insert(member.id, member);
    }
}

#[async_trait]
impl MemberDirectory for InMemoryMemberDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>, DomainError> {
        Ok(self.members.read().await.get(&id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Member>, DomainError> {
        Ok(self
            .members
            .read()
            .await
            .values()
            .find(|m| m.external_id == external_id)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Member>, DomainError> {
        let members = self.members.read().await;
        Ok(ids.iter().filter_map(|id| members.get(id)).cloned().collect())
    }
}

/// A message recorded in an in-memory channel.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub deleted: bool,
}

#[derive(Debug, Default)]
struct ChannelState {
    channels: HashMap<Uuid, ConversationChannel>,
    messages: Vec<ChannelMessage>,
}

/// In-memory conversation channel service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannelService {
    state: Arc<Mutex<ChannelState>>,
    /// Whether `create` simulates a failure.
    pub fail_create: bool,
    /// Whether `soft_delete` simulates a failure.
    pub fail_delete: bool,
}

impl InMemoryChannelService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            fail_delete: true,
            ..Self::default()
        }
    }

    /// A service that opens channels but fails to retire them.
    pub fn failing_deletes() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    pub async fn channel(&self, id: Uuid) -> Option<ConversationChannel> {
        self.state.lock().await.channels.get(&id).cloned()
    }

    pub async fn channels(&self) -> Vec<ConversationChannel> {
        self.state.lock().await.channels.values().cloned().collect()
    }

    pub async fn channel_count(&self) -> usize {
        self.state.lock().await.channels.len()
    }

    pub async fn messages(&self, channel_id: Uuid) -> Vec<ChannelMessage> {
        self.state
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChannelService for InMemoryChannelService {
    async fn create(&self, title: &str, created_by: Uuid) -> Result<Uuid, DomainError> {
        if self.fail_create {
            tracing::warn!(title = %title, "In-memory channel service simulating failure");
            return Err(DomainError::Unavailable("Simulated channel failure".into()));
        }
        let channel = ConversationChannel::new(title, created_by);
        let id = channel.id;
        let mut state = self.state.lock().await;
        state.channels.insert(id, channel);
        state.messages.push(ChannelMessage {
            channel_id: id,
            author_id: created_by,
            content: CHANNEL_CREATED_MESSAGE.to_string(),
            deleted: false,
        });
        Ok(id)
    }

    async fn soft_delete(&self, channel_id: Uuid) -> Result<(), DomainError> {
        if self.fail_delete {
            tracing::warn!(channel_id = %channel_id, "In-memory channel service simulating failure");
            return Err(DomainError::Unavailable("Simulated channel failure".into()));
        }
        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Some(channel) = state.channels.get_mut(&channel_id) {
            channel.deleted_at.get_or_insert(now);
        }
        for message in state.messages.iter_mut().filter(|m| m.channel_id == channel_id) {
            message.deleted = true;
        }
        Ok(())
    }
}
