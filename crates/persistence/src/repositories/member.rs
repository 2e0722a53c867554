//! Member repository for database operations.
//!
//! Members are owned by the account service; this repository only reads them.

use async_trait::async_trait;
use domain::models::Member;
use domain::store::MemberDirectory;
use domain::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::MemberEntity;
use crate::metrics::timed;

const MEMBER_COLUMNS: &str =
    "id, external_id, display_name, profile_image, authority, latitude, longitude, created_at";

/// Repository for member lookups.
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    /// Creates a new MemberRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MemberEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM members WHERE id = $1 AND deleted_at IS NULL",
            MEMBER_COLUMNS
        );
        timed(
            "find_member_by_id",
            sqlx::query_as::<_, MemberEntity>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<MemberEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM members WHERE external_id = $1 AND deleted_at IS NULL",
            MEMBER_COLUMNS
        );
        timed(
            "find_member_by_external_id",
            sqlx::query_as::<_, MemberEntity>(&sql)
                .bind(external_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MemberEntity>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM members WHERE id = ANY($1) AND deleted_at IS NULL",
            MEMBER_COLUMNS
        );
        timed(
            "find_members_by_ids",
            sqlx::query_as::<_, MemberEntity>(&sql)
                .bind(ids)
                .fetch_all(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl MemberDirectory for MemberRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>, DomainError> {
        Ok(MemberRepository::find_by_id(self, id).await?.map(Member::from))
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Member>, DomainError> {
        Ok(MemberRepository::find_by_external_id(self, external_id)
            .await?
            .map(Member::from))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Member>, DomainError> {
        Ok(MemberRepository::find_by_ids(self, ids)
            .await?
            .into_iter()
            .map(Member::from)
            .collect())
    }
}
