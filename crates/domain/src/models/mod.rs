//! Domain models for Partyhub.

pub mod channel;
pub mod listing;
pub mod member;
pub mod membership;

pub use channel::{ConversationChannel, CHANNEL_CREATED_MESSAGE};
pub use listing::{
    CreateListingRequest, CreateListingResponse, ImageAttachment, Listing, ListingSummary,
    RecruitmentFilter, UpdateListingRequest,
};
pub use member::{Member, MemberAuthority, ParticipantProfile};
pub use membership::{
    ApprovalOutcome, ApprovalRequest, JoinOutcome, Membership, MembershipStatus,
    ParticipationFilter, ParticipationState,
};
