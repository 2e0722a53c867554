//! Custom Axum extractors.

pub mod member;

pub use member::{CurrentMember, Viewer};
