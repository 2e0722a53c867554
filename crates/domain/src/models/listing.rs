//! Party listing domain models.

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::member::{Member, ParticipantProfile};
use crate::models::membership::ParticipationState;

/// Represents a capacity-bounded party listing.
///
/// `current_count` includes the host. `recruitment_open` is derived and kept
/// in sync by [`Listing::refresh_recruitment`]; it is stored so that listing
/// scans can filter on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub place_name: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub total_count: i32,
    pub current_count: i32,
    pub recruitment_open: bool,
    /// Set by the host to stop recruiting while slots remain.
    pub recruitment_closed: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: Option<String>,
    pub host_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Builds a new listing hosted by `host`, who occupies the first slot.
    pub fn new(request: &CreateListingRequest, host: &Member, image_url: Option<String>) -> Self {
        let now = Utc::now();
        let mut listing = Self {
            id: Uuid::new_v4(),
            title: request.title.trim().to_string(),
            content: request.content.clone(),
            place_name: request.place_name.clone(),
            scheduled_at: request.scheduled_at,
            total_count: request.total_count,
            current_count: 1,
            recruitment_open: false,
            recruitment_closed: false,
            latitude: request.latitude,
            longitude: request.longitude,
            image_url,
            host_name: host.display_name.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        listing.refresh_recruitment();
        listing
    }

    /// Recomputes `recruitment_open` from the counts and the manual close flag.
    pub fn refresh_recruitment(&mut self) {
        self.recruitment_open = self.current_count < self.total_count && !self.recruitment_closed;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Takes one slot for an approved member.
    ///
    /// Returns false, leaving the listing untouched, when recruitment is not
    /// open.
    pub fn admit(&mut self) -> bool {
        if !self.recruitment_open {
            return false;
        }
        self.current_count += 1;
        self.refresh_recruitment();
        self.updated_at = Utc::now();
        true
    }

    /// Gives back the slot of an accepted member who left.
    pub fn release(&mut self) {
        if self.current_count > 0 {
            self.current_count -= 1;
        }
        self.refresh_recruitment();
        self.updated_at = Utc::now();
    }

    /// Applies a partial update from the host.
    pub fn apply_update(
        &mut self,
        request: &UpdateListingRequest,
        image_url: Option<String>,
    ) -> Result<(), DomainError> {
        if let Some(total) = request.total_count {
            if total < self.current_count {
                return Err(DomainError::Validation(format!(
                    "Total count {} is below the {} members already accepted",
                    total, self.current_count
                )));
            }
            self.total_count = total;
        }
        if let Some(title) = &request.title {
            self.title = title.trim().to_string();
        }
        if let Some(content) = &request.content {
            self.content = content.clone();
        }
        if let Some(place_name) = &request.place_name {
            self.place_name = Some(place_name.clone());
        }
        if let Some(scheduled_at) = request.scheduled_at {
            self.scheduled_at = scheduled_at;
        }
        if let Some(latitude) = request.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = request.longitude {
            self.longitude = longitude;
        }
        if let Some(closed) = request.recruitment_closed {
            self.recruitment_closed = closed;
        }
        if image_url.is_some() {
            self.image_url = image_url;
        }
        self.refresh_recruitment();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Location as a point (x = longitude, y = latitude).
    pub fn location(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Reference to an already-uploaded image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    /// Declared MIME type, checked against the allow-list.
    pub content_type: String,
    pub url: String,
}

/// Request payload for creating a listing.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title must be between 1 and 100 characters"
    ))]
    pub title: String,

    #[validate(length(max = 2000, message = "Content must be at most 2000 characters"))]
    #[serde(default)]
    pub content: String,

    #[validate(length(max = 200, message = "Place name must be at most 200 characters"))]
    pub place_name: Option<String>,

    pub scheduled_at: DateTime<Utc>,

    #[validate(range(min = 1, max = 100, message = "Total count must be between 1 and 100"))]
    pub total_count: i32,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    pub image: Option<ImageAttachment>,
}

/// Request payload for updating a listing (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title must be between 1 and 100 characters"
    ))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Content must be at most 2000 characters"))]
    pub content: Option<String>,

    #[validate(length(max = 200, message = "Place name must be at most 200 characters"))]
    pub place_name: Option<String>,

    pub scheduled_at: Option<DateTime<Utc>>,

    #[validate(range(min = 1, max = 100, message = "Total count must be between 1 and 100"))]
    pub total_count: Option<i32>,

    #[validate(custom(function = "crate::models::listing::validate_optional_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "crate::models::listing::validate_optional_longitude"))]
    pub longitude: Option<f64>,

    pub recruitment_closed: Option<bool>,

    pub image: Option<ImageAttachment>,
}

/// Validates optional latitude.
pub fn validate_optional_latitude(lat: f64) -> Result<(), validator::ValidationError> {
    shared::validation::validate_latitude(lat)
}

/// Validates optional longitude.
pub fn validate_optional_longitude(lon: f64) -> Result<(), validator::ValidationError> {
    shared::validation::validate_longitude(lon)
}

/// Recruitment filter for listing scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecruitmentFilter {
    #[default]
    All,
    Open,
    Closed,
}

impl RecruitmentFilter {
    /// The `recruitment_open` value to match, or `None` for all listings.
    pub fn recruitment_open(&self) -> Option<bool> {
        match self {
            RecruitmentFilter::All => None,
            RecruitmentFilter::Open => Some(true),
            RecruitmentFilter::Closed => Some(false),
        }
    }
}

impl TryFrom<u8> for RecruitmentFilter {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RecruitmentFilter::All),
            1 => Ok(RecruitmentFilter::Open),
            2 => Ok(RecruitmentFilter::Closed),
            other => Err(DomainError::Validation(format!(
                "Unknown recruitment status filter: {}",
                other
            ))),
        }
    }
}

/// A listing as presented to a viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub party_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub total_count: i32,
    pub current_count: i32,
    pub recruitment_open: bool,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub host_name: String,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ParticipationState>,
}

impl ListingSummary {
    pub fn new(listing: Listing, participants: Vec<ParticipantProfile>) -> Self {
        Self {
            party_id: listing.id,
            title: listing.title,
            content: listing.content,
            place_name: listing.place_name,
            scheduled_at: listing.scheduled_at,
            total_count: listing.total_count,
            current_count: listing.current_count,
            recruitment_open: listing.recruitment_open,
            latitude: listing.latitude,
            longitude: listing.longitude,
            image_url: listing.image_url,
            host_name: listing.host_name,
            created_at: listing.created_at,
            participants,
            distance_km: None,
            state: None,
        }
    }

    pub fn with_distance(mut self, distance_km: f64) -> Self {
        self.distance_km = Some(distance_km);
        self
    }

    pub fn with_state(mut self, state: ParticipationState) -> Self {
        self.state = Some(state);
        self
    }
}

/// Response for creating a listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingResponse {
    pub party_id: Uuid,
    pub channel_id: Uuid,
}
