//! Party listing entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the parties table.
#[derive(Debug, Clone, FromRow)]
pub struct ListingEntity {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub place_name: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub total_count: i32,
    pub current_count: i32,
    pub recruitment_open: bool,
    pub recruitment_closed: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: Option<String>,
    pub host_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ListingEntity> for domain::models::Listing {
    fn from(entity: ListingEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            content: entity.content,
            place_name: entity.place_name,
            scheduled_at: entity.scheduled_at,
            total_count: entity.total_count,
            current_count: entity.current_count,
            recruitment_open: entity.recruitment_open,
            recruitment_closed: entity.recruitment_closed,
            latitude: entity.latitude,
            longitude: entity.longitude,
            image_url: entity.image_url,
            host_name: entity.host_name,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            deleted_at: entity.deleted_at,
        }
    }
}
