//! Member domain model.
//!
//! Members are owned by the account service; the party core only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account standing of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberAuthority {
    User,
    Admin,
    Blocked,
}

impl MemberAuthority {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberAuthority::User => "user",
            MemberAuthority::Admin => "admin",
            MemberAuthority::Blocked => "blocked",
        }
    }
}

impl FromStr for MemberAuthority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MemberAuthority::User),
            "admin" => Ok(MemberAuthority::Admin),
            "blocked" | "block" => Ok(MemberAuthority::Blocked),
            _ => Err(format!("Invalid member authority: {}", s)),
        }
    }
}

impl fmt::Display for MemberAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member as seen by the party core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    /// Identifier assigned by the social login provider; the token subject.
    pub external_id: String,
    pub display_name: String,
    pub profile_image: Option<String>,
    pub authority: MemberAuthority,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Member {
    pub fn is_blocked(&self) -> bool {
        self.authority == MemberAuthority::Blocked
    }
}

/// Public profile of a listing participant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProfile {
    pub member_id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub host: bool,
}

impl ParticipantProfile {
    pub fn of(member: &Member, host: bool) -> Self {
        Self {
            member_id: member.id,
            display_name: member.display_name.clone(),
            profile_image: member.profile_image.clone(),
            host,
        }
    }
}
