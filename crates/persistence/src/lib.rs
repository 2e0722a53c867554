//! Persistence layer for Partyhub.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The transaction-backed unit of work

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod unit_of_work;

pub use unit_of_work::{PgPartyStore, PgUnitOfWork};
