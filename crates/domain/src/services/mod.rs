//! Domain services for Partyhub.
//!
//! Services contain the participation, lifecycle and query logic and reach
//! storage only through the ports in [`crate::store`].

pub mod lifecycle;
pub mod participation;
pub mod proximity;
pub mod query;
pub mod roster;

#[cfg(test)]
pub(crate) mod fixtures;

pub use lifecycle::{ListingLifecycle, PurgeReport, RetirementPolicy, SweepReport};
pub use participation::ParticipationService;
pub use proximity::{haversine_km, within_radius, EARTH_RADIUS_KM};
pub use query::{ListingQuery, SearchCriteria};
