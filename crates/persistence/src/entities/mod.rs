//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod listing;
pub mod member;
pub mod membership;

pub use listing::ListingEntity;
pub use member::MemberEntity;
pub use membership::MembershipEntity;
