//! Persistence and collaborator ports used by the party core.
//!
//! Every state-changing operation runs inside one [`UnitOfWork`] obtained from
//! a [`PartyStore`]. Listing rows read with
//! [`ListingStore::find_listing_for_update`] stay locked until the unit of work
//! commits or rolls back, which is what serializes capacity changes.
//!
//! Members and conversation channels are owned elsewhere; the core talks to
//! them through [`MemberDirectory`] and [`ChannelService`] outside of any unit
//! of work.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::pagination::PageRequest;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{Listing, Member, Membership, MembershipStatus, RecruitmentFilter};

/// Listing reads and writes inside a unit of work.
#[async_trait]
pub trait ListingStore: Send {
    async fn insert_listing(&mut self, listing: &Listing) -> Result<(), DomainError>;

    /// Active (not soft-deleted) listing by id.
    async fn find_listing(&mut self, id: Uuid) -> Result<Option<Listing>, DomainError>;

    /// Active listing by id, locked until the unit of work ends.
    async fn find_listing_for_update(&mut self, id: Uuid) -> Result<Option<Listing>, DomainError>;

    /// Active listings by id, in no particular order.
    async fn find_listings_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Listing>, DomainError>;

    async fn update_listing(&mut self, listing: &Listing) -> Result<(), DomainError>;

    /// One page of active listings, newest first.
    async fn find_listing_page(
        &mut self,
        filter: RecruitmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Listing>, DomainError>;

    /// One page of active listings whose title, content or place name contains
    /// `keyword` (case-insensitive), newest first.
    async fn find_listing_page_by_keyword(
        &mut self,
        filter: RecruitmentFilter,
        page: PageRequest,
        keyword: &str,
    ) -> Result<Vec<Listing>, DomainError>;

    /// Active listings scheduled strictly before `cutoff`, oldest first.
    async fn find_listings_scheduled_before(
        &mut self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, DomainError>;

    /// Returns false when the listing was already deleted or never existed.
    async fn soft_delete_listing(&mut self, id: Uuid) -> Result<bool, DomainError>;
}

/// Membership reads and writes inside a unit of work.
///
/// All finders only see active (not soft-deleted) records.
#[async_trait]
pub trait MembershipStore: Send {
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError>;

    async fn find_membership(&mut self, id: Uuid) -> Result<Option<Membership>, DomainError>;

    async fn find_membership_by_listing_and_member(
        &mut self,
        listing_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Membership>, DomainError>;

    /// Active memberships of a listing in creation order.
    async fn find_active_by_listing(
        &mut self,
        listing_id: Uuid,
    ) -> Result<Vec<Membership>, DomainError>;

    async fn find_host_by_listing(
        &mut self,
        listing_id: Uuid,
    ) -> Result<Option<Membership>, DomainError>;

    /// Active memberships of a member, newest first.
    async fn find_by_member(&mut self, member_id: Uuid) -> Result<Vec<Membership>, DomainError>;

    async fn update_membership_status(
        &mut self,
        id: Uuid,
        status: MembershipStatus,
    ) -> Result<(), DomainError>;

    async fn soft_delete_membership(&mut self, id: Uuid) -> Result<(), DomainError>;

    /// Returns the number of memberships retired.
    async fn soft_delete_by_listing(&mut self, listing_id: Uuid) -> Result<u64, DomainError>;

    /// Returns the number of memberships retired.
    async fn soft_delete_by_member(&mut self, member_id: Uuid) -> Result<u64, DomainError>;
}

/// A scoped, atomic unit of work over listings and memberships.
///
/// Dropping a unit of work without committing discards its writes.
#[async_trait]
pub trait UnitOfWork: ListingStore + MembershipStore + Send {
    async fn commit(self) -> Result<(), DomainError>;

    async fn rollback(self) -> Result<(), DomainError>;
}

/// Entry point to the listing and membership storage.
#[async_trait]
pub trait PartyStore: Send + Sync + 'static {
    type Work: UnitOfWork;

    async fn begin(&self) -> Result<Self::Work, DomainError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Read-only access to member accounts.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>, DomainError>;

    /// Looks a member up by the identifier carried in access tokens.
    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<Member>, DomainError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Member>, DomainError>;
}

/// Conversation channel commands.
#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Opens a channel and records its seed message. Returns the channel id.
    async fn create(&self, title: &str, created_by: Uuid) -> Result<Uuid, DomainError>;

    /// Retires a channel and its messages.
    async fn soft_delete(&self, channel_id: Uuid) -> Result<(), DomainError>;
}

/// Commits `work` when `result` is Ok, rolls it back otherwise.
///
/// A failed rollback is logged and the original error is returned.
pub async fn complete<W: UnitOfWork, T>(
    work: W,
    result: Result<T, DomainError>,
) -> Result<T, DomainError> {
    match result {
        Ok(value) => {
            work.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = work.rollback().await {
                tracing::warn!(error = %rollback_err, "Failed to roll back unit of work");
            }
            Err(err)
        }
    }
}
