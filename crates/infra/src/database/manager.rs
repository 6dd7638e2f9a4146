//! Database connection manager backed by the shared SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fieldsync_common::storage::{SqliteConnection, SqlitePool, SqlitePoolConfig, StorageError};
use fieldsync_common::ErrorClassification;
use fieldsync_domain::{FieldSyncError, Result};
use rusqlite::{params, OptionalExtension};
use tracing::{error, info, warn};

use crate::errors::InfraError;

pub const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");
/// Pool checkouts attempted before a retryable failure is surfaced.
const CHECKOUT_ATTEMPTS: u32 = 3;

/// Database manager that wraps an [`SqlitePool`].
pub struct DbManager {
    pool: Arc<SqlitePool>,
    path: PathBuf,
}

impl DbManager {
    /// Open the queue database with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let config = SqlitePoolConfig { max_size: pool_size.max(1), ..SqlitePoolConfig::default() };
        Self::with_pool_config(db_path, config)
    }

    /// Open the queue database with explicit pool settings.
    pub fn with_pool_config<P: AsRef<Path>>(db_path: P, config: SqlitePoolConfig) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                FieldSyncError::Database(format!(
                    "cannot create database directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let pool = SqlitePool::new(&path, config).map_err(map_storage_error)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool: Arc::new(pool), path })
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &Arc<SqlitePool> {
        &self.pool
    }

    /// Acquire a connection from the pool.
    ///
    /// Transient checkout failures (pool exhausted, database busy) are
    /// retried before being reported.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        let mut attempt = 1;
        loop {
            match self.pool.get_connection() {
                Ok(conn) => return Ok(conn),
                Err(err) if err.is_retryable() && attempt < CHECKOUT_ATTEMPTS => {
                    warn!(attempt, error = %err, "connection checkout failed; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(map_storage_error(err)),
            }
        }
    }

    /// Ensure the full schema exists on the current database.
    ///
    /// Refuses to open a database written by a newer schema.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;

        let found: Option<i32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .optional()
            .map_err(map_sql_error)?
            .flatten();

        match found {
            Some(version) if version > SCHEMA_VERSION => {
                warn!(found = version, expected = SCHEMA_VERSION, "database schema is newer than this build");
                Err(map_storage_error(StorageError::SchemaVersionMismatch {
                    expected: SCHEMA_VERSION,
                    found: version,
                }))
            }
            Some(version) if version == SCHEMA_VERSION => Ok(()),
            _ => {
                conn.execute(
                    "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
                    params![SCHEMA_VERSION],
                )
                .map_err(map_sql_error)?;
                info!(version = SCHEMA_VERSION, "schema applied");
                Ok(())
            }
        }
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and answering queries.
    pub fn health_check(&self) -> Result<()> {
        self.pool.health_check().map_err(map_storage_error)
    }
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> FieldSyncError {
    FieldSyncError::from(InfraError::from(err))
}

pub(crate) fn map_storage_error(err: StorageError) -> FieldSyncError {
    if err.is_critical() {
        error!(severity = %err.severity(), error = %err, "critical storage failure");
    }
    FieldSyncError::from(InfraError::from(err))
}
