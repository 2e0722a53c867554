//! Party listing repository for database operations.
//!
//! Functions take a connection so they can run inside a unit of work.

use chrono::{DateTime, Utc};
use domain::models::Listing;
use shared::pagination::PageRequest;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::ListingEntity;
use crate::metrics::timed;

const LISTING_COLUMNS: &str = r#"
    id, title, content, place_name, scheduled_at, total_count, current_count,
    recruitment_open, recruitment_closed, latitude, longitude, image_url,
    host_name, created_at, updated_at, deleted_at
"#;

/// Escapes LIKE wildcards so a keyword matches literally.
pub fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Repository for party listing rows.
pub struct ListingRepository;

impl ListingRepository {
    pub async fn insert(conn: &mut PgConnection, listing: &Listing) -> Result<(), sqlx::Error> {
        timed(
            "insert_party",
            sqlx::query(
                r#"
                INSERT INTO parties (
                    id, title, content, place_name, scheduled_at, total_count, current_count,
                    recruitment_open, recruitment_closed, latitude, longitude, image_url,
                    host_name, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                "#,
            )
            .bind(listing.id)
            .bind(&listing.title)
            .bind(&listing.content)
            .bind(&listing.place_name)
            .bind(listing.scheduled_at)
            .bind(listing.total_count)
            .bind(listing.current_count)
            .bind(listing.recruitment_open)
            .bind(listing.recruitment_closed)
            .bind(listing.latitude)
            .bind(listing.longitude)
            .bind(&listing.image_url)
            .bind(&listing.host_name)
            .bind(listing.created_at)
            .bind(listing.updated_at)
            .execute(conn),
        )
        .await?;
        Ok(())
    }

    /// Find an active listing by ID.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<ListingEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM parties WHERE id = $1 AND deleted_at IS NULL",
            LISTING_COLUMNS
        );
        timed(
            "find_party_by_id",
            sqlx::query_as::<_, ListingEntity>(&sql)
                .bind(id)
                .fetch_optional(conn),
        )
        .await
    }

    /// Find an active listing by ID and lock its row for the rest of the
    /// transaction.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<ListingEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM parties WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            LISTING_COLUMNS
        );
        timed(
            "find_party_for_update",
            sqlx::query_as::<_, ListingEntity>(&sql)
                .bind(id)
                .fetch_optional(conn),
        )
        .await
    }

    pub async fn find_by_ids(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<ListingEntity>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM parties WHERE id = ANY($1) AND deleted_at IS NULL",
            LISTING_COLUMNS
        );
        timed(
            "find_parties_by_ids",
            sqlx::query_as::<_, ListingEntity>(&sql)
                .bind(ids)
                .fetch_all(conn),
        )
        .await
    }

    /// Write back the mutable fields of a listing.
    pub async fn update(conn: &mut PgConnection, listing: &Listing) -> Result<u64, sqlx::Error> {
        let result = timed(
            "update_party",
            sqlx::query(
                r#"
                UPDATE parties
                SET title = $2, content = $3, place_name = $4, scheduled_at = $5,
                    total_count = $6, current_count = $7, recruitment_open = $8,
                    recruitment_closed = $9, latitude = $10, longitude = $11,
                    image_url = $12, updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                "#,
            )
            .bind(listing.id)
            .bind(&listing.title)
            .bind(&listing.content)
            .bind(&listing.place_name)
            .bind(listing.scheduled_at)
            .bind(listing.total_count)
            .bind(listing.current_count)
            .bind(listing.recruitment_open)
            .bind(listing.recruitment_closed)
            .bind(listing.latitude)
            .bind(listing.longitude)
            .bind(&listing.image_url)
            .execute(conn),
        )
        .await?;
        Ok(result.rows_affected())
    }

    /// One page of active listings, newest first, optionally filtered on
    /// `recruitment_open` and on a keyword.
    pub async fn find_page(
        conn: &mut PgConnection,
        recruitment_open: Option<bool>,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<ListingEntity>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM parties
            WHERE deleted_at IS NULL
              AND ($1::BOOLEAN IS NULL OR recruitment_open = $1)
              AND ($2::TEXT IS NULL
                   OR title ILIKE $2
                   OR content ILIKE $2
                   OR place_name ILIKE $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            LISTING_COLUMNS
        );
        let pattern = keyword.map(|k| format!("%{}%", escape_like(k)));
        let query_name = if pattern.is_some() {
            "find_party_page_by_keyword"
        } else {
            "find_party_page"
        };
        timed(
            query_name,
            sqlx::query_as::<_, ListingEntity>(&sql)
                .bind(recruitment_open)
                .bind(pattern)
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(conn),
        )
        .await
    }

    /// Active listings scheduled before `cutoff`, oldest first.
    pub async fn find_scheduled_before(
        conn: &mut PgConnection,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ListingEntity>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM parties
            WHERE deleted_at IS NULL AND scheduled_at < $1
            ORDER BY scheduled_at ASC
            LIMIT $2
            "#,
            LISTING_COLUMNS
        );
        timed(
            "find_parties_scheduled_before",
            sqlx::query_as::<_, ListingEntity>(&sql)
                .bind(cutoff)
                .bind(limit)
                .fetch_all(conn),
        )
        .await
    }

    /// Returns true when a row was retired.
    pub async fn soft_delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = timed(
            "soft_delete_party",
            sqlx::query(
                "UPDATE parties SET deleted_at = NOW(), updated_at = NOW() \
                 WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .execute(conn),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("soju"), "soju");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\"), "c:\\\\");
    }
}
