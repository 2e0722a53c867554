//! Shared utilities and common types for the Partyhub backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Access token verification
//! - Offset pagination primitives
//! - Common validation logic

pub mod jwt;
pub mod pagination;
pub mod validation;
