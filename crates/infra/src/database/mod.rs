//! Database implementations

pub mod manager;
pub mod record_cache_repository;

pub use manager::{DbManager, SqliteConnection};
pub use record_cache_repository::SqliteRecordCache;
