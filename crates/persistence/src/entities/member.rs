//! Member entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Member, MemberAuthority};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the members table.
#[derive(Debug, Clone, FromRow)]
pub struct MemberEntity {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: String,
    pub profile_image: Option<String>,
    pub authority: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<MemberEntity> for Member {
    fn from(entity: MemberEntity) -> Self {
        // an unreadable authority must never grant access
        let authority = entity
            .authority
            .parse::<MemberAuthority>()
            .unwrap_or(MemberAuthority::Blocked);

        Self {
            id: entity.id,
            external_id: entity.external_id,
            display_name: entity.display_name,
            profile_image: entity.profile_image,
            authority,
            latitude: entity.latitude,
            longitude: entity.longitude,
        }
    }
}
