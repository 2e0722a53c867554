//! PostgreSQL-backed unit of work.
//!
//! Each unit of work is one transaction. Listing rows are locked with
//! `SELECT ... FOR UPDATE`, and every statement is bounded by
//! `statement_timeout` so a stuck lock surfaces as a retryable error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{Listing, Membership, MembershipStatus, RecruitmentFilter};
use domain::store::{ListingStore, MembershipStore, PartyStore, UnitOfWork};
use domain::DomainError;
use shared::pagination::PageRequest;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::MembershipEntity;
use crate::repositories::{ListingRepository, MembershipRepository};

/// Listing and membership storage on PostgreSQL.
#[derive(Clone)]
pub struct PgPartyStore {
    pool: PgPool,
    statement_timeout_ms: u64,
}

impl PgPartyStore {
    pub fn new(pool: PgPool, statement_timeout_ms: u64) -> Self {
        Self {
            pool,
            statement_timeout_ms,
        }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PartyStore for PgPartyStore {
    type Work = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Work, DomainError> {
        let mut tx = self.pool.begin().await?;
        if self.statement_timeout_ms > 0 {
            // SET does not take bind parameters; the value is an integer
            sqlx::query(&format!(
                "SET LOCAL statement_timeout = {}",
                self.statement_timeout_ms
            ))
            .execute(&mut *tx)
            .await?;
        }
        Ok(PgUnitOfWork { tx })
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One database transaction.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn into_memberships(rows: Vec<MembershipEntity>) -> Result<Vec<Membership>, DomainError> {
    rows.into_iter().map(MembershipEntity::into_domain).collect()
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<(), DomainError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DomainError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl ListingStore for PgUnitOfWork {
    async fn insert_listing(&mut self, listing: &Listing) -> Result<(), DomainError> {
        ListingRepository::insert(&mut self.tx, listing).await?;
        Ok(())
    }

    async fn find_listing(&mut self, id: Uuid) -> Result<Option<Listing>, DomainError> {
        Ok(ListingRepository::find_by_id(&mut self.tx, id)
            .await?
            .map(Listing::from))
    }

    async fn find_listing_for_update(&mut self, id: Uuid) -> Result<Option<Listing>, DomainError> {
        Ok(ListingRepository::find_by_id_for_update(&mut self.tx, id)
            .await?
            .map(Listing::from))
    }

    async fn find_listings_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Listing>, DomainError> {
        Ok(ListingRepository::find_by_ids(&mut self.tx, ids)
            .await?
            .into_iter()
            .map(Listing::from)
            .collect())
    }

    async fn update_listing(&mut self, listing: &Listing) -> Result<(), DomainError> {
        match ListingRepository::update(&mut self.tx, listing).await? {
            0 => Err(DomainError::not_found("Party not found")),
            _ => Ok(()),
        }
    }

    async fn find_listing_page(
        &mut self,
        filter: RecruitmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Listing>, DomainError> {
        Ok(
            ListingRepository::find_page(&mut self.tx, filter.recruitment_open(), None, page)
                .await?
                .into_iter()
                .map(Listing::from)
                .collect(),
        )
    }

    async fn find_listing_page_by_keyword(
        &mut self,
        filter: RecruitmentFilter,
        page: PageRequest,
        keyword: &str,
    ) -> Result<Vec<Listing>, DomainError> {
        Ok(ListingRepository::find_page(
            &mut self.tx,
            filter.recruitment_open(),
            Some(keyword),
            page,
        )
        .await?
        .into_iter()
        .map(Listing::from)
        .collect())
    }

    async fn find_listings_scheduled_before(
        &mut self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Listing>, DomainError> {
        Ok(
            ListingRepository::find_scheduled_before(&mut self.tx, cutoff, limit)
                .await?
                .into_iter()
                .map(Listing::from)
                .collect(),
        )
    }

    async fn soft_delete_listing(&mut self, id: Uuid) -> Result<bool, DomainError> {
        Ok(ListingRepository::soft_delete(&mut self.tx, id).await?)
    }
}

#[async_trait]
impl MembershipStore for PgUnitOfWork {
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        MembershipRepository::insert(&mut self.tx, membership).await?;
        Ok(())
    }

    async fn find_membership(&mut self, id: Uuid) -> Result<Option<Membership>, DomainError> {
        MembershipRepository::find_by_id(&mut self.tx, id)
            .await?
            .map(MembershipEntity::into_domain)
            .transpose()
    }

    async fn find_membership_by_listing_and_member(
        &mut self,
        listing_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Membership>, DomainError> {
        MembershipRepository::find_by_party_and_member(&mut self.tx, listing_id, member_id)
            .await?
            .map(MembershipEntity::into_domain)
            .transpose()
    }

    async fn find_active_by_listing(
        &mut self,
        listing_id: Uuid,
    ) -> Result<Vec<Membership>, DomainError> {
        into_memberships(MembershipRepository::find_by_party(&mut self.tx, listing_id).await?)
    }

    async fn find_host_by_listing(
        &mut self,
        listing_id: Uuid,
    ) -> Result<Option<Membership>, DomainError> {
        MembershipRepository::find_host_by_party(&mut self.tx, listing_id)
            .await?
            .map(MembershipEntity::into_domain)
            .transpose()
    }

    async fn find_by_member(&mut self, member_id: Uuid) -> Result<Vec<Membership>, DomainError> {
        into_memberships(MembershipRepository::find_by_member(&mut self.tx, member_id).await?)
    }

    async fn update_membership_status(
        &mut self,
        id: Uuid,
        status: MembershipStatus,
    ) -> Result<(), DomainError> {
        match MembershipRepository::update_status(&mut self.tx, id, status).await? {
            0 => Err(DomainError::not_found("Membership not found")),
            _ => Ok(()),
        }
    }

    async fn soft_delete_membership(&mut self, id: Uuid) -> Result<(), DomainError> {
        MembershipRepository::soft_delete(&mut self.tx, id).await?;
        Ok(())
    }

    async fn soft_delete_by_listing(&mut self, listing_id: Uuid) -> Result<u64, DomainError> {
        Ok(MembershipRepository::soft_delete_by_party(&mut self.tx, listing_id).await?)
    }

    async fn soft_delete_by_member(&mut self, member_id: Uuid) -> Result<u64, DomainError> {
        Ok(MembershipRepository::soft_delete_by_member(&mut self.tx, member_id).await?)
    }
}
