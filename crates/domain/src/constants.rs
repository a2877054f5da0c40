//! Application constants
//!
//! Centralized location for domain-level defaults shared by the client,
//! the sync orchestrator and the configuration loader.

// ERP client
pub const DEFAULT_ERP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;
pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 3;

// Sync
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_SYNC_PAGE_SIZE: usize = 100;

// Local cache
pub const DEFAULT_DB_PATH: &str = "campusbridge.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

/// Timestamp layout used by ERPNext for `modified`/`creation` fields.
pub const ERP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
