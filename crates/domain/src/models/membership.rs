//! Participation (membership) domain models and the transition table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::member::ParticipantProfile;

/// State of one member's relationship to one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Awaiting,
    Accepted,
    Rejected,
    Host,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Awaiting => "awaiting",
            MembershipStatus::Accepted => "accepted",
            MembershipStatus::Rejected => "rejected",
            MembershipStatus::Host => "host",
        }
    }

    /// True when the member occupies a capacity slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, MembershipStatus::Accepted | MembershipStatus::Host)
    }

    /// Target state of an approval.
    pub fn approve(self) -> Result<MembershipStatus, DomainError> {
        match self {
            MembershipStatus::Awaiting => Ok(MembershipStatus::Accepted),
            other => Err(DomainError::InvalidState(format!(
                "Cannot approve a {} membership",
                other
            ))),
        }
    }

    /// Target state of a rejection. Rejecting twice is a no-op.
    pub fn reject(self) -> Result<MembershipStatus, DomainError> {
        match self {
            MembershipStatus::Awaiting | MembershipStatus::Rejected => {
                Ok(MembershipStatus::Rejected)
            }
            other => Err(DomainError::InvalidState(format!(
                "Cannot reject a {} membership; remove the member instead",
                other
            ))),
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "awaiting" => Ok(MembershipStatus::Awaiting),
            "accepted" => Ok(MembershipStatus::Accepted),
            "rejected" => Ok(MembershipStatus::Rejected),
            "host" => Ok(MembershipStatus::Host),
            _ => Err(format!("Invalid membership status: {}", s)),
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member's participation record for a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub member_id: Uuid,
    pub status: MembershipStatus,
    /// Conversation channel, set on the host record only.
    pub channel_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// A fresh join request.
    pub fn request(listing_id: Uuid, member_id: Uuid) -> Self {
        Self::with_status(listing_id, member_id, MembershipStatus::Awaiting, None)
    }

    /// The host record created with a listing.
    pub fn host(listing_id: Uuid, member_id: Uuid, channel_id: Uuid) -> Self {
        Self::with_status(
            listing_id,
            member_id,
            MembershipStatus::Host,
            Some(channel_id),
        )
    }

    fn with_status(
        listing_id: Uuid,
        member_id: Uuid,
        status: MembershipStatus,
        channel_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            listing_id,
            member_id,
            status,
            channel_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Result of a join/leave toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinOutcome {
    Requested,
    Cancelled,
    AlreadyHost,
    Rejected,
}

/// Result of an approval. `Full` is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalOutcome {
    Approved,
    Full,
}

/// Viewer-facing participation code.
///
/// Serialized as its numeric code: 0 none, 1 accepted or host, 2 awaiting,
/// 3 rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationState {
    None,
    Accepted,
    Awaiting,
    Rejected,
}

impl ParticipationState {
    pub fn code(&self) -> u8 {
        match self {
            ParticipationState::None => 0,
            ParticipationState::Accepted => 1,
            ParticipationState::Awaiting => 2,
            ParticipationState::Rejected => 3,
        }
    }

    /// Projects an optional active membership status onto a viewer code.
    pub fn of(status: Option<MembershipStatus>) -> Self {
        match status {
            None => ParticipationState::None,
            Some(MembershipStatus::Accepted) | Some(MembershipStatus::Host) => {
                ParticipationState::Accepted
            }
            Some(MembershipStatus::Awaiting) => ParticipationState::Awaiting,
            Some(MembershipStatus::Rejected) => ParticipationState::Rejected,
        }
    }
}

impl Serialize for ParticipationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Filter for a member's own participations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticipationFilter {
    /// Accepted and awaiting.
    #[default]
    All,
    Accepted,
    Awaiting,
}

impl ParticipationFilter {
    pub fn matches(&self, status: MembershipStatus) -> bool {
        match self {
            ParticipationFilter::All => matches!(
                status,
                MembershipStatus::Accepted | MembershipStatus::Awaiting
            ),
            ParticipationFilter::Accepted => status == MembershipStatus::Accepted,
            ParticipationFilter::Awaiting => status == MembershipStatus::Awaiting,
        }
    }
}

impl TryFrom<u8> for ParticipationFilter {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ParticipationFilter::All),
            1 => Ok(ParticipationFilter::Accepted),
            2 => Ok(ParticipationFilter::Awaiting),
            other => Err(DomainError::Validation(format!(
                "Unknown participation filter: {}",
                other
            ))),
        }
    }
}

/// A pending join request as shown to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub membership_id: Uuid,
    pub party_id: Uuid,
    pub party_title: String,
    pub requester: ParticipantProfile,
    pub requested_at: DateTime<Utc>,
}
