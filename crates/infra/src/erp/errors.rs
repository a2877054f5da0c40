//! ERP access errors
//!
//! Every failure of the remote access layer is one of these variants. The
//! route-facing query methods absorb them; the sync path propagates them.

use campusbridge_domain::CampusBridgeError;
use thiserror::Error;

/// Errors raised while talking to the ERP.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, timeout or other failure below HTTP.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The ERP answered with a non-success status.
    #[error("ERP returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the JSON shape we expected.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The client has been closed.
    #[error("Client closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Describe a reqwest failure that happened before a status was read.
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_body() || err.is_decode() {
            "failed to read response body"
        } else {
            "request failed"
        };
        Self::Transport(format!("{kind}: {err}"))
    }
}

impl From<ApiError> for CampusBridgeError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(_) | ApiError::Closed => Self::Network(err.to_string()),
            ApiError::Status { status: 404, .. } => Self::NotFound(err.to_string()),
            ApiError::Status { .. } | ApiError::Decode(_) => Self::Upstream(err.to_string()),
            ApiError::Config(message) => Self::Config(message),
        }
    }
}
