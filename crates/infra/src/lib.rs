//! # CampusBridge Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The rate-limited HTTP client and the ERPNext REST client
//! - The domain query layer over ERPNext resources
//! - The SQLite cache (rusqlite + r2d2)
//! - The background sync scheduler
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `campusbridge-core`
//! - Contains all "impure" code (I/O, network, filesystem)

pub mod config;
pub mod database;
pub mod erp;
pub mod errors;
pub mod http;
pub mod scheduling;

// Re-export commonly used items
pub use database::{DbManager, SqliteRecordCache};
pub use erp::{ApiError, ErpClient, ErpQueries, ScheduleFilter};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use scheduling::{SchedulerError, SyncScheduler, SyncSchedulerConfig};
