//! Queries over the `sync_operations` table.

use crate::db::{now_string, parse_datetime, parse_optional_datetime, parse_text};
use crate::{
    Database, DatabaseError, DatabaseResult, EnqueueEffects, EnqueueReceipt, NewSyncOperation,
    OperationId, OperationKind, OperationStatus, StatusCounts, SyncOperation, Visibility,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const OPERATION_COLUMNS: &str = "id, content_id, kind, visibility, payload, status, retry_count, last_error, created_at, updated_at, last_attempt_at, completed_at";

impl Database {
    /// Append a pending operation without touching local records.
    ///
    /// The store never merges or replaces rows.
    pub fn insert_sync_operation(&self, op: &NewSyncOperation) -> DatabaseResult<OperationId> {
        let conn = self.conn();
        let id = insert_operation(&conn, op, &now_string())?;
        debug!(operation_id = id, content_id = %op.content_id, kind = op.kind.as_str(), "Sync operation stored");
        Ok(id)
    }

    /// Append an operation and apply its local effects in one transaction.
    ///
    /// Pending operations named by `effects.cancel_kinds` are cancelled, the
    /// content item (or charter) with the operation's id moves to `queued`,
    /// and the item's visibility is updated when requested. Ids with no local
    /// record are tolerated; the handler reports them when the operation runs.
    pub fn enqueue_sync_operation(
        &self,
        op: &NewSyncOperation,
        effects: &EnqueueEffects,
    ) -> DatabaseResult<EnqueueReceipt> {
        let now = now_string();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut cancelled = 0;
        for kind in &effects.cancel_kinds {
            cancelled += cancel_pending(&tx, &op.content_id, *kind, &now)?;
        }

        let operation_id = insert_operation(&tx, op, &now)?;

        let touched = match effects.visibility {
            Some(visibility) => tx.execute(
                "UPDATE content_items SET sync_status = 'queued', visibility = ?2, updated_at = ?3
                 WHERE id = ?1",
                params![op.content_id, visibility.as_str(), now],
            )?,
            None => tx.execute(
                "UPDATE content_items SET sync_status = 'queued' WHERE id = ?1",
                params![op.content_id],
            )?,
        };
        if touched == 0 {
            tx.execute(
                "UPDATE charters SET sync_status = 'queued' WHERE id = ?1",
                params![op.content_id],
            )?;
        }

        tx.commit()?;
        debug!(
            operation_id,
            content_id = %op.content_id,
            kind = op.kind.as_str(),
            cancelled,
            "Sync operation enqueued"
        );
        Ok(EnqueueReceipt {
            operation_id,
            cancelled,
        })
    }

    /// Get an operation by ID.
    pub fn get_sync_operation(&self, id: OperationId) -> DatabaseResult<Option<SyncOperation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OPERATION_COLUMNS} FROM sync_operations WHERE id = ?1"
        ))?;
        Ok(stmt.query_row(params![id], operation_from_row).optional()?)
    }

    /// Pending operations below the retry bound, oldest first.
    pub fn get_pending_sync_operations(
        &self,
        max_retries: u32,
    ) -> DatabaseResult<Vec<SyncOperation>> {
        self.query_pending("retry_count < ?1", max_retries)
    }

    /// Pending operations that already used up their retries. These exist
    /// only when marking an operation failed did not go through.
    pub fn get_exhausted_sync_operations(
        &self,
        max_retries: u32,
    ) -> DatabaseResult<Vec<SyncOperation>> {
        self.query_pending("retry_count >= ?1", max_retries)
    }

    fn query_pending(&self, retry_filter: &str, max_retries: u32) -> DatabaseResult<Vec<SyncOperation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OPERATION_COLUMNS} FROM sync_operations
             WHERE status = 'pending' AND {retry_filter}
             ORDER BY created_at ASC, id ASC"
        ))?;
        let ops = stmt
            .query_map(params![max_retries], operation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ops)
    }

    /// All operations, newest first, for diagnostics.
    pub fn list_operations(&self, limit: usize) -> DatabaseResult<Vec<SyncOperation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OPERATION_COLUMNS} FROM sync_operations
             ORDER BY created_at DESC, id DESC
             LIMIT ?1"
        ))?;
        let ops = stmt
            .query_map(params![limit as i64], operation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ops)
    }

    /// Mark a pending operation completed.
    ///
    /// Returns false, leaving the row alone, when the operation is no longer
    /// pending (for example cancelled while its remote call was in flight).
    pub fn mark_sync_operation_completed(&self, id: OperationId) -> DatabaseResult<bool> {
        let now = now_string();
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE sync_operations
             SET status = 'completed', completed_at = ?2, last_attempt_at = ?2, updated_at = ?2
             WHERE id = ?1 AND status = 'pending'",
            params![id, now],
        )?;
        if updated > 0 {
            return Ok(true);
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sync_operations WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(false)
        } else {
            Err(DatabaseError::NotFound(format!("sync operation {id}")))
        }
    }

    /// Record a failed attempt and return the new retry count.
    pub fn record_sync_operation_failure(
        &self,
        id: OperationId,
        error: &str,
    ) -> DatabaseResult<u32> {
        let now = now_string();
        let conn = self.conn();
        let retry_count: Option<u32> = conn
            .query_row(
                "UPDATE sync_operations
                 SET retry_count = retry_count + 1, last_error = ?2,
                     last_attempt_at = ?3, updated_at = ?3
                 WHERE id = ?1
                 RETURNING retry_count",
                params![id, error, now],
                |row| row.get(0),
            )
            .optional()?;
        retry_count.ok_or_else(|| DatabaseError::NotFound(format!("sync operation {id}")))
    }

    /// Move an operation to the terminal `failed` state.
    pub fn mark_sync_operation_failed(&self, id: OperationId, error: &str) -> DatabaseResult<()> {
        let now = now_string();
        let updated = self.conn().execute(
            "UPDATE sync_operations
             SET status = 'failed', last_error = ?2, updated_at = ?3
             WHERE id = ?1",
            params![id, error, now],
        )?;
        ensure_updated(updated, id)
    }

    /// Cancel every pending operation of `kind` for a content item.
    pub fn cancel_pending_sync_operations(
        &self,
        content_id: &str,
        kind: OperationKind,
    ) -> DatabaseResult<usize> {
        Ok(cancel_pending(&self.conn(), content_id, kind, &now_string())?)
    }

    /// Cancel pending operations of `kind` for a content item, except `excluding`.
    pub fn cancel_duplicate_sync_operations(
        &self,
        content_id: &str,
        kind: OperationKind,
        excluding: OperationId,
    ) -> DatabaseResult<usize> {
        let now = now_string();
        let cancelled = self.conn().execute(
            "UPDATE sync_operations SET status = 'cancelled', updated_at = ?4
             WHERE content_id = ?1 AND kind = ?2 AND status = 'pending' AND id != ?3",
            params![content_id, kind.as_str(), excluding, now],
        )?;
        Ok(cancelled)
    }

    /// Pending and failed operation counts.
    pub fn sync_operation_counts(&self) -> DatabaseResult<StatusCounts> {
        let counts = self.conn().query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
             FROM sync_operations",
            [],
            |row| {
                Ok(StatusCounts {
                    pending: row.get::<_, i64>(0)? as u64,
                    failed: row.get::<_, i64>(1)? as u64,
                })
            },
        )?;
        Ok(counts)
    }

    /// Whether any operation of `kind` for a content item ever completed.
    pub fn has_completed_sync_operation(
        &self,
        content_id: &str,
        kind: OperationKind,
    ) -> DatabaseResult<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sync_operations
                WHERE content_id = ?1 AND kind = ?2 AND status = 'completed'
             )",
            params![content_id, kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

fn insert_operation(conn: &Connection, op: &NewSyncOperation, now: &str) -> rusqlite::Result<OperationId> {
    conn.execute(
        "INSERT INTO sync_operations (content_id, kind, visibility, payload, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
        params![
            op.content_id,
            op.kind.as_str(),
            op.visibility.as_str(),
            op.payload,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn cancel_pending(
    conn: &Connection,
    content_id: &str,
    kind: OperationKind,
    now: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE sync_operations SET status = 'cancelled', updated_at = ?3
         WHERE content_id = ?1 AND kind = ?2 AND status = 'pending'",
        params![content_id, kind.as_str(), now],
    )
}

fn ensure_updated(updated: usize, id: OperationId) -> DatabaseResult<()> {
    if updated == 0 {
        return Err(DatabaseError::NotFound(format!("sync operation {id}")));
    }
    Ok(())
}

fn operation_from_row(row: &Row<'_>) -> rusqlite::Result<SyncOperation> {
    Ok(SyncOperation {
        id: row.get(0)?,
        content_id: row.get(1)?,
        kind: parse_text(2, row.get::<_, String>(2)?, OperationKind::parse)?,
        visibility: parse_text(3, row.get::<_, String>(3)?, Visibility::parse)?,
        payload: row.get(4)?,
        status: parse_text(5, row.get::<_, String>(5)?, OperationStatus::parse)?,
        retry_count: row.get(6)?,
        last_error: row.get(7)?,
        created_at: parse_datetime(8, row.get(8)?)?,
        updated_at: parse_datetime(9, row.get(9)?)?,
        last_attempt_at: parse_optional_datetime(10, row.get(10)?)?,
        completed_at: parse_optional_datetime(11, row.get(11)?)?,
    })
}
