//! HTTP route handlers.

pub mod health;
pub mod me;
pub mod participations;
pub mod parties;
