//! Party membership repository for database operations.

use domain::models::{Membership, MembershipStatus};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::MembershipEntity;
use crate::metrics::timed;

const MEMBERSHIP_COLUMNS: &str =
    "id, party_id, member_id, status, channel_id, created_at, updated_at, deleted_at";

/// Repository for party membership rows. Finders only return active rows.
pub struct MembershipRepository;

impl MembershipRepository {
    /// Insert a membership. A second active row for the same party and member
    /// violates `party_memberships_active_pair`.
    pub async fn insert(
        conn: &mut PgConnection,
        membership: &Membership,
    ) -> Result<(), sqlx::Error> {
        timed(
            "insert_party_membership",
            sqlx::query(
                r#"
                INSERT INTO party_memberships (
                    id, party_id, member_id, status, channel_id, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(membership.id)
            .bind(membership.listing_id)
            .bind(membership.member_id)
            .bind(membership.status.as_str())
            .bind(membership.channel_id)
            .bind(membership.created_at)
            .bind(membership.updated_at)
            .execute(conn),
        )
        .await?;
        Ok(())
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<MembershipEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM party_memberships WHERE id = $1 AND deleted_at IS NULL",
            MEMBERSHIP_COLUMNS
        );
        timed(
            "find_party_membership_by_id",
            sqlx::query_as::<_, MembershipEntity>(&sql)
                .bind(id)
                .fetch_optional(conn),
        )
        .await
    }

    pub async fn find_by_party_and_member(
        conn: &mut PgConnection,
        party_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<MembershipEntity>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM party_memberships
            WHERE party_id = $1 AND member_id = $2 AND deleted_at IS NULL
            "#,
            MEMBERSHIP_COLUMNS
        );
        timed(
            "find_party_membership_by_pair",
            sqlx::query_as::<_, MembershipEntity>(&sql)
                .bind(party_id)
                .bind(member_id)
                .fetch_optional(conn),
        )
        .await
    }

    /// Active memberships of a party in creation order.
    pub async fn find_by_party(
        conn: &mut PgConnection,
        party_id: Uuid,
    ) -> Result<Vec<MembershipEntity>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM party_memberships
            WHERE party_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
            MEMBERSHIP_COLUMNS
        );
        timed(
            "find_party_memberships_by_party",
            sqlx::query_as::<_, MembershipEntity>(&sql)
                .bind(party_id)
                .fetch_all(conn),
        )
        .await
    }

    pub async fn find_host_by_party(
        conn: &mut PgConnection,
        party_id: Uuid,
    ) -> Result<Option<MembershipEntity>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM party_memberships
            WHERE party_id = $1 AND status = 'host' AND deleted_at IS NULL
            LIMIT 1
            "#,
            MEMBERSHIP_COLUMNS
        );
        timed(
            "find_party_host",
            sqlx::query_as::<_, MembershipEntity>(&sql)
                .bind(party_id)
                .fetch_optional(conn),
        )
        .await
    }

    /// Active memberships of a member, newest first.
    pub async fn find_by_member(
        conn: &mut PgConnection,
        member_id: Uuid,
    ) -> Result<Vec<MembershipEntity>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM party_memberships
            WHERE member_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
            MEMBERSHIP_COLUMNS
        );
        timed(
            "find_party_memberships_by_member",
            sqlx::query_as::<_, MembershipEntity>(&sql)
                .bind(member_id)
                .fetch_all(conn),
        )
        .await
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: MembershipStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = timed(
            "update_party_membership_status",
            sqlx::query(
                r#"
                UPDATE party_memberships SET status = $2, updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                "#,
            )
            .bind(id)
            .bind(status.as_str())
            .execute(conn),
        )
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete(conn: &mut PgConnection, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = timed(
            "soft_delete_party_membership",
            sqlx::query(
                "UPDATE party_memberships SET deleted_at = NOW(), updated_at = NOW() \
                 WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .execute(conn),
        )
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete_by_party(
        conn: &mut PgConnection,
        party_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = timed(
            "soft_delete_party_memberships_by_party",
            sqlx::query(
                "UPDATE party_memberships SET deleted_at = NOW(), updated_at = NOW() \
                 WHERE party_id = $1 AND deleted_at IS NULL",
            )
            .bind(party_id)
            .execute(conn),
        )
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete_by_member(
        conn: &mut PgConnection,
        member_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = timed(
            "soft_delete_party_memberships_by_member",
            sqlx::query(
                "UPDATE party_memberships SET deleted_at = NOW(), updated_at = NOW() \
                 WHERE member_id = $1 AND deleted_at IS NULL",
            )
            .bind(member_id)
            .execute(conn),
        )
        .await?;
        Ok(result.rows_affected())
    }
}
