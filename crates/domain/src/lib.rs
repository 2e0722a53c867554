//! Domain layer for Partyhub.
//!
//! This crate contains:
//! - Domain models (Listing, Membership, Member, ConversationChannel)
//! - Storage and collaborator ports
//! - Participation, lifecycle and query services
//! - In-memory port implementations
//! - Domain error types

pub mod error;
pub mod memory;
pub mod models;
pub mod services;
pub mod store;

pub use error::DomainError;
