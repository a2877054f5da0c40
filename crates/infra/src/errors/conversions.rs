//! Conversions from external infrastructure errors into domain errors.

use campusbridge_domain::CampusBridgeError;
use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CampusBridgeError);

impl From<InfraError> for CampusBridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CampusBridgeError> for InfraError {
    fn from(value: CampusBridgeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCampusBridgeError {
    fn into_campusbridge(self) -> CampusBridgeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CampusBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCampusBridgeError for SqlError {
    fn into_campusbridge(self) -> CampusBridgeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        CampusBridgeError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        CampusBridgeError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 1555 | 2067) => {
                        CampusBridgeError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::NotADatabase, _) => {
                        CampusBridgeError::Database("file is not a SQLite database".into())
                    }
                    (ErrorCode::DiskFull, _) => {
                        CampusBridgeError::Database("database or disk is full".into())
                    }
                    _ => CampusBridgeError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                CampusBridgeError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                CampusBridgeError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                CampusBridgeError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => CampusBridgeError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => CampusBridgeError::Database("invalid SQL query".into()),
            other => CampusBridgeError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_campusbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CampusBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCampusBridgeError for PoolError {
    fn into_campusbridge(self) -> CampusBridgeError {
        CampusBridgeError::Database(format!("connection pool error: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_campusbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CampusBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCampusBridgeError for HttpError {
    fn into_campusbridge(self) -> CampusBridgeError {
        if self.is_timeout() {
            return CampusBridgeError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CampusBridgeError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return CampusBridgeError::Config(format!("invalid HTTP client setup: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => CampusBridgeError::NotFound(message),
                400..=499 => CampusBridgeError::InvalidInput(message),
                _ => CampusBridgeError::Upstream(message),
            };
        }

        CampusBridgeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_campusbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
