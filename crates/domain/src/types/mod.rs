//! Domain types and models

pub mod entity;
pub mod filter;
pub mod record;
pub mod sync;

pub use entity::EntityType;
pub use filter::{Condition, FilterOp, QueryFilter};
pub use record::{format_erp_timestamp, parse_erp_timestamp, Record};
pub use sync::{EntitySyncOutcome, SyncOutcomeStatus, SyncReport, SyncStats, SyncWatermark};
