//! # CampusBridge Domain
//!
//! Business domain types for the ERPNext access layer.
//!
//! This crate contains:
//! - Entity types, records and query filters
//! - Sync watermarks and sync reports
//! - Domain error types and Result definitions
//! - Configuration structures and defaults
//!
//! ## Architecture
//! - No dependencies on other CampusBridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
