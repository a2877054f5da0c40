//! Shared test helpers for `campusbridge-core` integration tests.
//!
//! In-memory stand-ins for the sync ports so orchestrator tests can focus on
//! watermark and merge behaviour instead of I/O.

#![allow(dead_code)]

pub mod repositories;

use campusbridge_domain::Record;
use serde_json::json;

/// Build a record with the given identifier and ERP `modified` timestamp.
pub fn record(id: &str, modified: &str) -> Record {
    Record::try_from(json!({ "name": id, "modified": modified, "title": format!("{id} title") }))
        .expect("record fixture")
}
