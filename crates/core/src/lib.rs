//! # CampusBridge Core
//!
//! Pure sync logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the remote ERP and the local cache
//! - The sync orchestrator that merges remote changes into the cache
//!
//! ## Architecture Principles
//! - Only depends on `campusbridge-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod sync;

pub use sync::ports::{RecordCache, RemoteRecordSource};
pub use sync::service::{SyncService, SyncSettings, CANCELLED_REASON};
