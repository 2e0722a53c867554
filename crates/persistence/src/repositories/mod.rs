//! Repository implementations for database operations.

pub mod channel;
pub mod listing;
pub mod member;
pub mod membership;

pub use channel::ChannelRepository;
pub use listing::ListingRepository;
pub use member::MemberRepository;
pub use membership::MembershipRepository;
