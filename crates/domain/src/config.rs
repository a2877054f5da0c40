//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_PATH, DEFAULT_DB_POOL_SIZE, DEFAULT_ERP_TIMEOUT_SECS,
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_IDLE_CONNECTIONS, DEFAULT_SYNC_INTERVAL_SECS,
    DEFAULT_SYNC_PAGE_SIZE,
};
use crate::{CampusBridgeError, Result};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub erp: ErpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// ERPNext connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Size of the admission gate shared by every outbound request.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,
}

/// Local cache database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub interval_seconds: u64,
    pub page_size: usize,
    pub enabled: bool,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_ERP_TIMEOUT_SECS
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_max_idle_connections() -> usize {
    DEFAULT_MAX_IDLE_CONNECTIONS
}

impl ErpConfig {
    /// Settings for the given endpoint and credentials, other values defaulted.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            timeout_seconds: DEFAULT_ERP_TIMEOUT_SECS,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_SYNC_INTERVAL_SECS,
            page_size: DEFAULT_SYNC_PAGE_SIZE,
            enabled: true,
        }
    }
}

impl Config {
    /// Build a configuration for the given ERP settings with default database
    /// and sync sections.
    pub fn new(erp: ErpConfig) -> Self {
        Self { erp, database: DatabaseConfig::default(), sync: SyncConfig::default() }
    }

    /// Reject configurations the client cannot start with.
    ///
    /// Missing credentials are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.erp.base_url.trim().is_empty() {
            return Err(CampusBridgeError::Config("ERP base URL is not set".into()));
        }
        if self.erp.api_key.trim().is_empty() || self.erp.api_secret.trim().is_empty() {
            return Err(CampusBridgeError::Config("ERP API key and secret are required".into()));
        }
        if self.erp.max_concurrent_requests == 0 {
            return Err(CampusBridgeError::Config(
                "max_concurrent_requests must be greater than 0".into(),
            ));
        }
        if self.sync.page_size == 0 {
            return Err(CampusBridgeError::Config("sync page_size must be greater than 0".into()));
        }
        if self.sync.interval_seconds == 0 {
            return Err(CampusBridgeError::Config(
                "sync interval_seconds must be greater than 0".into(),
            ));
        }
        if self.database.pool_size == 0 {
            return Err(CampusBridgeError::Config("database pool_size must be greater than 0".into()));
        }
        Ok(())
    }
}
