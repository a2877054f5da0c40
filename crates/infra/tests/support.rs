//! Shared fixtures for infra integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use campusbridge_domain::ErpConfig;
use campusbridge_infra::database::{DbManager, SqliteRecordCache};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a migrated database in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("cache.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("migrations should run");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn cache(&self) -> SqliteRecordCache {
        SqliteRecordCache::new(Arc::clone(&self.manager))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Client settings pointing at a mock server.
pub fn erp_config(base_url: &str) -> ErpConfig {
    ErpConfig::new(base_url, "test-key", "test-secret")
}

/// `{"data": [...]}` envelope as returned by list endpoints.
pub fn list_body(items: Vec<Value>) -> Value {
    json!({ "data": items })
}

pub fn student(id: &str, name: &str, modified: &str) -> Value {
    json!({
        "name": id,
        "student_name": name,
        "student_email_id": format!("{}@example.edu", name.to_lowercase()),
        "modified": modified,
    })
}
