//! ERPNext integration
//!
//! - [`ErpClient`]: authenticated, rate-limited REST access
//! - [`ErpQueries`]: typed queries per doctype and the sync source
//! - [`ApiError`]: failure taxonomy of the remote layer

pub mod client;
pub mod errors;
pub mod queries;
pub mod query;

pub use client::ErpClient;
pub use errors::ApiError;
pub use queries::{ErpQueries, ScheduleFilter};
pub use query::ListQuery;
