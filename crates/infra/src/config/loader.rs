//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the ERP connection variables are missing, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `ERPNEXT_URL`: Base URL of the ERPNext site
//! - `ERPNEXT_API_KEY`: API key of the integration user
//! - `ERPNEXT_API_SECRET`: API secret of the integration user
//!
//! Optional (defaults in parentheses):
//! - `CAMPUSBRIDGE_ERP_TIMEOUT`: Request timeout in seconds (30)
//! - `CAMPUSBRIDGE_ERP_MAX_CONCURRENT`: Requests allowed in flight (5)
//! - `CAMPUSBRIDGE_DB_PATH`: Cache database file path (`campusbridge.db`)
//! - `CAMPUSBRIDGE_DB_POOL_SIZE`: Connection pool size (4)
//! - `CAMPUSBRIDGE_SYNC_INTERVAL`: Sync interval in seconds (600)
//! - `CAMPUSBRIDGE_SYNC_PAGE_SIZE`: Records per entity type and cycle (100)
//! - `CAMPUSBRIDGE_SYNC_ENABLED`: Whether background sync runs (true)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./campusbridge.json` or `./campusbridge.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use campusbridge_domain::{
    CampusBridgeError, Config, DatabaseConfig, ErpConfig, Result, SyncConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file. The
/// result is validated before it is returned.
///
/// # Errors
/// Returns `CampusBridgeError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Credentials are missing or limits are zero
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// The three ERP connection variables must be present; everything else
/// falls back to its default when unset.
///
/// # Errors
/// Returns `CampusBridgeError::Config` if required variables are missing
/// or an optional one holds an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut erp = ErpConfig::new(
        env_var("ERPNEXT_URL")?,
        env_var("ERPNEXT_API_KEY")?,
        env_var("ERPNEXT_API_SECRET")?,
    );
    erp.timeout_seconds = env_parse("CAMPUSBRIDGE_ERP_TIMEOUT", erp.timeout_seconds)?;
    erp.max_concurrent_requests =
        env_parse("CAMPUSBRIDGE_ERP_MAX_CONCURRENT", erp.max_concurrent_requests)?;

    let db_defaults = DatabaseConfig::default();
    let database = DatabaseConfig {
        path: std::env::var("CAMPUSBRIDGE_DB_PATH").unwrap_or(db_defaults.path),
        pool_size: env_parse("CAMPUSBRIDGE_DB_POOL_SIZE", db_defaults.pool_size)?,
    };

    let sync_defaults = SyncConfig::default();
    let sync = SyncConfig {
        interval_seconds: env_parse("CAMPUSBRIDGE_SYNC_INTERVAL", sync_defaults.interval_seconds)?,
        page_size: env_parse("CAMPUSBRIDGE_SYNC_PAGE_SIZE", sync_defaults.page_size)?,
        enabled: env_bool("CAMPUSBRIDGE_SYNC_ENABLED", sync_defaults.enabled),
    };

    Ok(Config { erp, database, sync })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CampusBridgeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CampusBridgeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CampusBridgeError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CampusBridgeError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CampusBridgeError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CampusBridgeError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CampusBridgeError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
        candidates.push(cwd.join("../config.json"));
        candidates.push(cwd.join("../config.toml"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("campusbridge.json"),
        dir.join("campusbridge.toml"),
    ]
}

/// Get required environment variable
///
/// Empty values count as missing.
fn env_var(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CampusBridgeError::Config(format!(
            "Missing required environment variable: {}",
            key
        ))),
    }
}

/// Parse an optional environment variable, using `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| CampusBridgeError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
