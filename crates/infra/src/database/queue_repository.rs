//! SQLite-backed implementation of the durable queue port.
//!
//! Every call checks out a pooled connection on the blocking thread pool.
//! Read-modify-write operations run inside an `IMMEDIATE` transaction so the
//! status check and the update see the same row, and the lifecycle rules
//! from [`PendingRecord`] are applied before anything is written.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fieldsync_common::storage::SqliteConnection;
use fieldsync_common::Clock;
use fieldsync_core::QueueStore;
use fieldsync_domain::{
    truncate_reason, FailureUpdate, FieldSyncError, MediaAttachment, NewRecord, PendingRecord,
    QueueStats, RecordStatus, Result as DomainResult, SyncErrorKind,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::task;
use tracing::{debug, info, instrument};

use super::manager::{map_sql_error, DbManager};

const LAST_SYNC_KEY: &str = "last_sync_at";

/// Durable queue over the local SQLite database.
pub struct SqliteQueueStore {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
}

impl SqliteQueueStore {
    /// Construct a store over a migrated database.
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Run `op` on a pooled connection off the async executor.
    async fn blocking<T, F>(&self, op: &'static str, f: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection, i64) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let now = self.clock.now_millis();

        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = db.get_connection()?;
            f(&mut conn, now)
        })
        .await
        .map_err(|err| FieldSyncError::Internal(format!("{op}: blocking task failed: {err}")))?
    }

    /// Load a record, let `apply` mutate it in memory, write the new state.
    fn mutate<F>(
        conn: &mut SqliteConnection,
        id: &str,
        apply: F,
    ) -> DomainResult<PendingRecord>
    where
        F: FnOnce(&mut PendingRecord) -> DomainResult<()>,
    {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sql_error)?;

        let mut record = load_record(&tx, id)?
            .ok_or_else(|| FieldSyncError::NotFound(format!("record {id}")))?;
        apply(&mut record)?;
        write_state(&tx, &record)?;

        tx.commit().map_err(map_sql_error)?;
        Ok(record)
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    #[instrument(skip(self, record), fields(media = record.media.len()))]
    async fn enqueue(&self, record: NewRecord) -> DomainResult<String> {
        self.blocking("enqueue", move |conn, now| {
            let record = PendingRecord::from_new(record, now);
            let tx = conn.transaction().map_err(map_sql_error)?;
            insert_record(&tx, &record)?;
            tx.commit().map_err(map_sql_error)?;
            debug!(record_id = %record.id, "record persisted");
            Ok(record.id)
        })
        .await
    }

    async fn list(&self, status: Option<RecordStatus>) -> DomainResult<Vec<PendingRecord>> {
        self.blocking("list", move |conn, _| list_records(conn, status)).await
    }

    async fn get(&self, id: &str) -> DomainResult<Option<PendingRecord>> {
        let id = id.to_string();
        self.blocking("get", move |conn, _| load_record(conn, &id)).await
    }

    #[instrument(skip(self, error))]
    async fn update_status(
        &self,
        id: &str,
        status: RecordStatus,
        error: Option<&str>,
    ) -> DomainResult<PendingRecord> {
        let id = id.to_string();
        let error = error.map(str::to_string);
        self.blocking("update_status", move |conn, now| {
            Self::mutate(conn, &id, |record| {
                if status == RecordStatus::Failed {
                    let kind = record.last_error_kind.unwrap_or(SyncErrorKind::UploadFailed);
                    let failure =
                        FailureUpdate::new(kind, error.unwrap_or_else(|| "sync failed".into()));
                    record.apply_failure(&failure, now)
                } else {
                    record.set_status(status, now)?;
                    if let Some(error) = error {
                        record.last_error = Some(truncate_reason(&error));
                    }
                    Ok(())
                }
            })
        })
        .await
    }

    #[instrument(skip(self, failure), fields(kind = %failure.kind, counted = failure.count_attempt))]
    async fn record_failure(&self, id: &str, failure: &FailureUpdate) -> DomainResult<PendingRecord> {
        let id = id.to_string();
        let failure = failure.clone();
        self.blocking("record_failure", move |conn, now| {
            Self::mutate(conn, &id, |record| record.apply_failure(&failure, now))
        })
        .await
    }

    async fn mark_media_uploaded(
        &self,
        record_id: &str,
        attachment_id: &str,
        remote_ref: &str,
    ) -> DomainResult<()> {
        let record_id = record_id.to_string();
        let attachment_id = attachment_id.to_string();
        let remote_ref = remote_ref.to_string();
        self.blocking("mark_media_uploaded", move |conn, _| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            let sql = format!("{MEDIA_SELECT_SQL} WHERE record_id = ?1 AND id = ?2");
            let mut attachment = tx
                .query_row(&sql, params![record_id, attachment_id], map_media_row)
                .optional()
                .map_err(map_sql_error)?
                .ok_or_else(|| {
                    FieldSyncError::NotFound(format!(
                        "attachment {attachment_id} of record {record_id}"
                    ))
                })?;
            if attachment.uploaded {
                return attachment.mark_uploaded(remote_ref);
            }
            attachment.mark_uploaded(remote_ref)?;

            tx.execute(
                MEDIA_MARK_UPLOADED_SQL,
                params![record_id, attachment_id, attachment.remote_ref],
            )
            .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str) -> DomainResult<bool> {
        let id = id.to_string();
        self.blocking("remove", move |conn, _| {
            let removed = conn
                .execute("DELETE FROM pending_records WHERE id = ?1", params![id])
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn reset_retry(&self, id: &str) -> DomainResult<PendingRecord> {
        let id = id.to_string();
        let record = self
            .blocking("reset_retry", move |conn, now| {
                Self::mutate(conn, &id, |record| {
                    // An in-flight record belongs to the running drain.
                    if record.status == RecordStatus::Syncing {
                        return Err(FieldSyncError::InvalidTransition {
                            id: record.id.clone(),
                            from: record.status,
                            to: RecordStatus::Pending,
                        });
                    }
                    if record.status != RecordStatus::Pending {
                        record.set_status(RecordStatus::Pending, now)?;
                    }
                    record.retry_count = 0;
                    record.last_error = None;
                    record.last_error_kind = None;
                    record.next_attempt_at = None;
                    record.updated_at = now;
                    Ok(())
                })
            })
            .await?;
        info!(record_id = %record.id, "retry counter reset");
        Ok(record)
    }

    async fn reset_for_retry(&self, id: &str, clear_deferral: bool) -> DomainResult<PendingRecord> {
        let id = id.to_string();
        self.blocking("reset_for_retry", move |conn, now| {
            Self::mutate(conn, &id, |record| {
                if record.status != RecordStatus::Failed {
                    return Err(FieldSyncError::InvalidTransition {
                        id: record.id.clone(),
                        from: record.status,
                        to: RecordStatus::Pending,
                    });
                }
                record.set_status(RecordStatus::Pending, now)?;
                if clear_deferral {
                    record.next_attempt_at = None;
                }
                Ok(())
            })
        })
        .await
    }

    async fn counts(&self) -> DomainResult<QueueStats> {
        self.blocking("counts", |conn, _| {
            let mut stmt = conn
                .prepare("SELECT status, COUNT(*) FROM pending_records GROUP BY status")
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(map_sql_error)?;

            let mut stats = QueueStats::default();
            for row in rows {
                let (status, count) = row.map_err(map_sql_error)?;
                let count = usize::try_from(count).unwrap_or(0);
                match status.parse::<RecordStatus>() {
                    Ok(RecordStatus::Pending) => stats.pending = count,
                    Ok(RecordStatus::Syncing) => stats.syncing = count,
                    Ok(RecordStatus::Failed) => stats.failed = count,
                    Ok(RecordStatus::Synced) | Err(_) => {}
                }
            }
            Ok(stats)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn recover_interrupted(&self) -> DomainResult<usize> {
        self.blocking("recover_interrupted", |conn, now| {
            conn.execute(
                "UPDATE pending_records SET status = 'pending', updated_at = ?1 WHERE status = 'syncing'",
                params![now],
            )
            .map_err(map_sql_error)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn purge_synced(&self) -> DomainResult<usize> {
        self.blocking("purge_synced", |conn, _| {
            conn.execute("DELETE FROM pending_records WHERE status = 'synced'", [])
                .map_err(map_sql_error)
        })
        .await
    }

    async fn set_last_sync_at(&self, at: i64) -> DomainResult<()> {
        self.blocking("set_last_sync_at", move |conn, _| {
            conn.execute(
                "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![LAST_SYNC_KEY, at],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
    }

    async fn last_sync_at(&self) -> DomainResult<Option<i64>> {
        self.blocking("last_sync_at", |conn, _| {
            conn.query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
    }
}

const RECORD_INSERT_SQL: &str = "INSERT INTO pending_records (
        id, idempotency_key, payload, status, retry_count, last_error, last_error_kind,
        priority, created_at, updated_at, next_attempt_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const MEDIA_INSERT_SQL: &str = "INSERT INTO media_attachments (
        id, record_id, position, local_ref, remote_ref, uploaded, size_bytes, mime_type
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const RECORD_SELECT_SQL: &str = "SELECT
        id, idempotency_key, payload, status, retry_count, last_error, last_error_kind,
        priority, created_at, updated_at, next_attempt_at
    FROM pending_records";

const RECORD_ORDER_SQL: &str = "ORDER BY priority DESC, created_at ASC, rowid ASC";

const MEDIA_SELECT_SQL: &str = "SELECT
        id, record_id, position, local_ref, remote_ref, uploaded, size_bytes, mime_type
    FROM media_attachments";

const RECORD_STATE_UPDATE_SQL: &str = "UPDATE pending_records SET
        status = ?2, retry_count = ?3, last_error = ?4, last_error_kind = ?5,
        next_attempt_at = ?6, updated_at = ?7
    WHERE id = ?1";

const MEDIA_MARK_UPLOADED_SQL: &str = "UPDATE media_attachments
    SET uploaded = 1, remote_ref = ?3
    WHERE record_id = ?1 AND id = ?2 AND uploaded = 0";

fn insert_record(conn: &Connection, record: &PendingRecord) -> DomainResult<()> {
    let payload = serde_json::to_string(&record.payload)
        .map_err(|err| FieldSyncError::InvalidInput(format!("payload is not serializable: {err}")))?;

    conn.execute(
        RECORD_INSERT_SQL,
        params![
            record.id,
            record.idempotency_key,
            payload,
            record.status.to_string(),
            record.retry_count,
            record.last_error,
            record.last_error_kind.map(|kind| kind.to_string()),
            record.priority,
            record.created_at,
            record.updated_at,
            record.next_attempt_at,
        ],
    )
    .map_err(map_sql_error)?;

    for media in &record.media {
        conn.execute(
            MEDIA_INSERT_SQL,
            params![
                media.id,
                media.record_id,
                media.position,
                media.local_ref,
                media.remote_ref,
                media.uploaded,
                media.size_bytes,
                media.mime_type,
            ],
        )
        .map_err(map_sql_error)?;
    }
    Ok(())
}

fn write_state(conn: &Connection, record: &PendingRecord) -> DomainResult<()> {
    conn.execute(
        RECORD_STATE_UPDATE_SQL,
        params![
            record.id,
            record.status.to_string(),
            record.retry_count,
            record.last_error,
            record.last_error_kind.map(|kind| kind.to_string()),
            record.next_attempt_at,
            record.updated_at,
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn load_record(conn: &Connection, id: &str) -> DomainResult<Option<PendingRecord>> {
    let sql = format!("{RECORD_SELECT_SQL} WHERE id = ?1");
    let record = conn
        .query_row(&sql, params![id], map_record_row)
        .optional()
        .map_err(map_sql_error)?;

    let Some(mut record) = record else {
        return Ok(None);
    };

    let sql = format!("{MEDIA_SELECT_SQL} WHERE record_id = ?1 ORDER BY position ASC");
    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    record.media = stmt
        .query_map(params![id], map_media_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;
    Ok(Some(record))
}

fn list_records(conn: &Connection, status: Option<RecordStatus>) -> DomainResult<Vec<PendingRecord>> {
    let status = status.map(|s| s.to_string());

    let sql = format!("{RECORD_SELECT_SQL} WHERE (?1 IS NULL OR status = ?1) {RECORD_ORDER_SQL}");
    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let mut records = stmt
        .query_map(params![status], map_record_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;

    if records.is_empty() {
        return Ok(records);
    }

    let sql = format!(
        "{MEDIA_SELECT_SQL} WHERE record_id IN (
            SELECT id FROM pending_records WHERE (?1 IS NULL OR status = ?1)
        ) ORDER BY record_id, position ASC"
    );
    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let mut media_by_record: HashMap<String, Vec<MediaAttachment>> = HashMap::new();
    for media in stmt.query_map(params![status], map_media_row).map_err(map_sql_error)? {
        let media = media.map_err(map_sql_error)?;
        media_by_record.entry(media.record_id.clone()).or_default().push(media);
    }

    for record in &mut records {
        if let Some(media) = media_by_record.remove(&record.id) {
            record.media = media;
        }
    }
    Ok(records)
}

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<PendingRecord> {
    let payload_raw: String = row.get(2)?;
    let payload = serde_json::from_str(&payload_raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;

    let status_raw: String = row.get(3)?;
    let status = status_raw
        .parse::<RecordStatus>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, err.into()))?;

    let kind_raw: Option<String> = row.get(6)?;
    let last_error_kind = kind_raw
        .map(|raw| raw.parse::<SyncErrorKind>())
        .transpose()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, err.into()))?;

    Ok(PendingRecord {
        id: row.get(0)?,
        idempotency_key: row.get(1)?,
        payload,
        media: Vec::new(),
        status,
        retry_count: row.get(4)?,
        last_error: row.get(5)?,
        last_error_kind,
        priority: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        next_attempt_at: row.get(10)?,
    })
}

fn map_media_row(row: &Row<'_>) -> rusqlite::Result<MediaAttachment> {
    Ok(MediaAttachment {
        id: row.get(0)?,
        record_id: row.get(1)?,
        position: row.get(2)?,
        local_ref: row.get(3)?,
        remote_ref: row.get(4)?,
        uploaded: row.get(5)?,
        size_bytes: row.get(6)?,
        mime_type: row.get(7)?,
    })
}
