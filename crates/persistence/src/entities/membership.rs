//! Party membership entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Membership, MembershipStatus};
use domain::DomainError;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the party_memberships table.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipEntity {
    pub id: Uuid,
    pub party_id: Uuid,
    pub member_id: Uuid,
    pub status: String,
    pub channel_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MembershipEntity {
    /// Convert to domain model. Fails on a status the domain does not know.
    pub fn into_domain(self) -> Result<Membership, DomainError> {
        let status = self
            .status
            .parse::<MembershipStatus>()
            .map_err(DomainError::Storage)?;

        Ok(Membership {
            id: self.id,
            listing_id: self.party_id,
            member_id: self.member_id,
            status,
            channel_id: self.channel_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}
