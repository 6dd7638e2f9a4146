//! Conversions from external infrastructure errors into domain errors.

use fieldsync_common::storage::StorageError;
use fieldsync_domain::FieldSyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FieldSyncError);

impl From<InfraError> for FieldSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FieldSyncError> for InfraError {
    fn from(value: FieldSyncError) -> Self {
        InfraError(value)
    }
}

trait IntoFieldSyncError {
    fn into_fieldsync(self) -> FieldSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl IntoFieldSyncError for SqlError {
    fn into_fieldsync(self) -> FieldSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        FieldSyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        FieldSyncError::Database("database is locked".into())
                    }
                    (ErrorCode::DiskFull, _) => FieldSyncError::Database("disk is full".into()),
                    (ErrorCode::ConstraintViolation, 2067) => {
                        FieldSyncError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        FieldSyncError::Database("foreign key constraint violation".into())
                    }
                    _ => FieldSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => FieldSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                FieldSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                FieldSyncError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                FieldSyncError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidPath(path) => FieldSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => FieldSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_fieldsync())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl IntoFieldSyncError for StorageError {
    fn into_fieldsync(self) -> FieldSyncError {
        match self {
            StorageError::Rusqlite(err) => err.into_fieldsync(),
            StorageError::InvalidConfig(msg) => FieldSyncError::Config(msg),
            other => FieldSyncError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_fieldsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2 / serde_json → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(FieldSyncError::Database(format!("connection pool error: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(FieldSyncError::Database(format!("stored JSON is invalid: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl IntoFieldSyncError for HttpError {
    fn into_fieldsync(self) -> FieldSyncError {
        if self.is_timeout() {
            return FieldSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return FieldSyncError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return FieldSyncError::Config(format!("invalid HTTP request: {self}"));
        }

        FieldSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_fieldsync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: FieldSyncError = InfraError::from(err).into();
        match mapped {
            FieldSyncError::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: FieldSyncError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, FieldSyncError::NotFound(_)));
    }

    #[test]
    fn storage_config_error_stays_a_config_error() {
        let err = StorageError::InvalidConfig("max_size must be at least 1".into());
        let mapped: FieldSyncError = InfraError::from(err).into();
        assert_eq!(mapped, FieldSyncError::Config("max_size must be at least 1".into()));
    }

    #[tokio::test]
    async fn refused_connection_maps_to_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let err = client.get(format!("http://{addr}/")).send().await.unwrap_err();

        let domain: FieldSyncError = InfraError::from(err).into();
        assert_eq!(domain, FieldSyncError::Network("HTTP connection failure".into()));
    }
}
