//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_local_content(conn)?;
    }
    if current_version < 2 {
        migrate_v2_sync_operations(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: content items and charters.
fn migrate_v1_local_content(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: local content");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS content_items (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            content_type TEXT NOT NULL,
            body TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            language TEXT NOT NULL DEFAULT 'en',
            visibility TEXT NOT NULL DEFAULT 'private',
            sync_status TEXT NOT NULL DEFAULT 'local',
            public_id TEXT,
            published_at TEXT,
            can_fork INTEGER NOT NULL DEFAULT 1,
            author_username TEXT,
            forked_from_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_content_items_updated_at
            ON content_items(updated_at);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_content_items_public_id
            ON content_items(public_id) WHERE public_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS charters (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            boat_name TEXT,
            destination TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            guests INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            visibility TEXT NOT NULL DEFAULT 'private',
            remote_id TEXT,
            sync_status TEXT NOT NULL DEFAULT 'local',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_charters_start_date
            ON charters(start_date);
        ",
    )?;

    record_migration(conn, 1, "local_content")?;
    Ok(())
}

/// V2: persisted sync operation log.
fn migrate_v2_sync_operations(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v2: sync operations");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sync_operations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            visibility TEXT NOT NULL DEFAULT 'private',
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_attempt_at TEXT,
            completed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_sync_operations_status_created
            ON sync_operations(status, created_at, id);
        CREATE INDEX IF NOT EXISTS idx_sync_operations_content_kind
            ON sync_operations(content_id, kind, status);
        ",
    )?;

    record_migration(conn, 2, "sync_operations")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 2);
    }

    #[test]
    fn tables_exist_after_migration() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["content_items", "charters", "sync_operations"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
