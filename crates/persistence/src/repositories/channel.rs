//! Conversation channel repository for database operations.

use async_trait::async_trait;
use domain::models::{ConversationChannel, CHANNEL_CREATED_MESSAGE};
use domain::store::ChannelService;
use domain::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::metrics::timed;

/// Repository for chat channels and their messages.
#[derive(Clone)]
pub struct ChannelRepository {
    pool: PgPool,
}

impl ChannelRepository {
    /// Creates a new ChannelRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a channel together with its seed message.
    pub async fn insert(&self, channel: &ConversationChannel) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        timed(
            "insert_chat_channel",
            sqlx::query(
                "INSERT INTO chat_channels (id, title, created_by, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(channel.id)
            .bind(&channel.title)
            .bind(channel.created_by)
            .bind(channel.created_at)
            .execute(&mut *tx),
        )
        .await?;

        timed(
            "insert_chat_message",
            sqlx::query(
                "INSERT INTO chat_messages (id, channel_id, author_id, content) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(channel.id)
            .bind(channel.created_by)
            .bind(CHANNEL_CREATED_MESSAGE)
            .execute(&mut *tx),
        )
        .await?;

        tx.commit().await
    }

    /// Soft-delete a channel and all of its messages.
    pub async fn soft_delete(&self, channel_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        timed(
            "soft_delete_chat_messages",
            sqlx::query(
                "UPDATE chat_messages SET deleted_at = NOW() \
                 WHERE channel_id = $1 AND deleted_at IS NULL",
            )
            .bind(channel_id)
            .execute(&mut *tx),
        )
        .await?;

        timed(
            "soft_delete_chat_channel",
            sqlx::query(
                "UPDATE chat_channels SET deleted_at = NOW() \
                 WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(channel_id)
            .execute(&mut *tx),
        )
        .await?;

        tx.commit().await
    }
}

#[async_trait]
impl ChannelService for ChannelRepository {
    async fn create(&self, title: &str, created_by: Uuid) -> Result<Uuid, DomainError> {
        let channel = ConversationChannel::new(title, created_by);
        self.insert(&channel).await?;
        Ok(channel.id)
    }

    async fn soft_delete(&self, channel_id: Uuid) -> Result<(), DomainError> {
        ChannelRepository::soft_delete(self, channel_id).await?;
        Ok(())
    }
}
