//! Conversation channel attached to a listing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Message recorded when a channel is opened for a new listing.
pub const CHANNEL_CREATED_MESSAGE: &str = "The chat room has been created";

/// A chat channel created together with its listing and retired with it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationChannel {
    pub id: Uuid,
    pub title: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ConversationChannel {
    pub fn new(title: &str, created_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_by,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
