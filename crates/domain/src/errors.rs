//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for CampusBridge
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CampusBridgeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The ERP answered, but not with something usable (non-2xx or bad JSON).
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CampusBridgeError {
    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Upstream(_) => "upstream",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for CampusBridge operations
pub type Result<T> = std::result::Result<T, CampusBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let err = CampusBridgeError::Upstream("HTTP 502".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Upstream");
        assert_eq!(json["message"], "HTTP 502");
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(CampusBridgeError::Network("x".into()).label(), "network");
        assert_eq!(CampusBridgeError::NotFound("x".into()).label(), "not_found");
    }
}
