//! Database connection and local content queries.

use crate::{
    migrations, Charter, CharterDraft, ContentBody, ContentItem, DatabaseError, DatabaseResult,
    NewContentItem, PublicMetadata, SyncStatus, Visibility,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use tracing::debug;

/// Database wrapper with query methods.
///
/// The connection sits behind a mutex so one `Database` can be shared as an
/// `Arc` between the publisher, the queue engine and the coordinator task.
pub struct Database {
    conn: Mutex<Connection>,
}

const CONTENT_COLUMNS: &str = "id, title, description, body, tags, language, visibility, sync_status, public_id, published_at, can_fork, author_username, forked_from_id, created_at, updated_at";

const CHARTER_COLUMNS: &str = "id, name, boat_name, destination, start_date, end_date, guests, notes, visibility, remote_id, sync_status, created_at, updated_at";

impl Database {
    /// Open a database at the given path, running migrations if needed.
    pub fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        migrations::run_migrations(&conn)?;
        debug!(path = %path.display(), "Database opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the underlying connection.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ==========================================
    // Content items
    // ==========================================

    /// Insert a new private, never-synced content item.
    pub fn insert_content_item(&self, item: &NewContentItem) -> DatabaseResult<ContentItem> {
        let now = now_string();
        let body = serde_json::to_string(&item.body)?;
        let tags = serde_json::to_string(&item.tags)?;
        self.conn().execute(
            "INSERT INTO content_items (id, title, description, content_type, body, tags, language, forked_from_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                item.id,
                item.title,
                item.description,
                item.body.content_type(),
                body,
                tags,
                item.language,
                item.forked_from_id,
                now,
            ],
        )?;
        self.get_content_item(&item.id)?
            .ok_or_else(|| DatabaseError::NotFound("Content item not found after insert".to_string()))
    }

    /// Get a content item by ID.
    pub fn get_content_item(&self, id: &str) -> DatabaseResult<Option<ContentItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = ?1"
        ))?;

        match stmt.query_row(params![id], content_item_from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List content items, most recently updated first.
    pub fn list_content_items(&self) -> DatabaseResult<Vec<ContentItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items ORDER BY updated_at DESC, id ASC"
        ))?;
        let items = stmt
            .query_map([], content_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Overwrite the mutable fields of a content item, including its public
    /// metadata. `updated_at` is taken from the item as given.
    pub fn update_content_item(&self, item: &ContentItem) -> DatabaseResult<()> {
        let body = serde_json::to_string(&item.body)?;
        let tags = serde_json::to_string(&item.tags)?;
        let updated = self.conn().execute(
            "UPDATE content_items
             SET title = ?2, description = ?3, content_type = ?4, body = ?5, tags = ?6,
                 language = ?7, visibility = ?8, public_id = ?9, published_at = ?10,
                 can_fork = ?11, author_username = ?12, forked_from_id = ?13, updated_at = ?14
             WHERE id = ?1",
            params![
                item.id,
                item.title,
                item.description,
                item.body.content_type(),
                body,
                tags,
                item.language,
                item.visibility.as_str(),
                item.public_id,
                item.published_at.map(format_datetime),
                item.can_fork,
                item.author_username,
                item.forked_from_id,
                format_datetime(item.updated_at),
            ],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(format!("content item {}", item.id)));
        }
        Ok(())
    }

    /// Attach server-assigned publish metadata without touching user-edited
    /// fields. Returns false if no item matched.
    pub fn set_public_metadata(&self, id: &str, metadata: &PublicMetadata) -> DatabaseResult<bool> {
        let updated = self.conn().execute(
            "UPDATE content_items
             SET public_id = ?2, published_at = ?3, can_fork = ?4, author_username = ?5
             WHERE id = ?1",
            params![
                id,
                metadata.public_id,
                format_datetime(metadata.published_at),
                metadata.can_fork,
                metadata.author_username,
            ],
        )?;
        Ok(updated > 0)
    }

    /// Drop server-assigned publish metadata, optionally making the item
    /// private again. Returns false if no item matched.
    pub fn clear_public_metadata(&self, id: &str, make_private: bool) -> DatabaseResult<bool> {
        let conn = self.conn();
        let updated = if make_private {
            conn.execute(
                "UPDATE content_items
                 SET visibility = 'private', public_id = NULL, published_at = NULL, author_username = NULL
                 WHERE id = ?1",
                params![id],
            )?
        } else {
            conn.execute(
                "UPDATE content_items
                 SET public_id = NULL, published_at = NULL, author_username = NULL
                 WHERE id = ?1",
                params![id],
            )?
        };
        Ok(updated > 0)
    }

    /// Set only `updated_at` of a content item. Returns false if no item matched.
    pub fn touch_content_item(&self, id: &str, updated_at: DateTime<Utc>) -> DatabaseResult<bool> {
        let updated = self.conn().execute(
            "UPDATE content_items SET updated_at = ?2 WHERE id = ?1",
            params![id, format_datetime(updated_at)],
        )?;
        Ok(updated > 0)
    }

    /// Set the sync status of a content item. Returns false if no item matched.
    pub fn set_content_sync_status(&self, id: &str, status: SyncStatus) -> DatabaseResult<bool> {
        let updated = self.conn().execute(
            "UPDATE content_items SET sync_status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(updated > 0)
    }

    // ==========================================
    // Charters
    // ==========================================

    /// Insert or update a charter from user-edited fields.
    ///
    /// The remote id and sync status survive an update.
    pub fn save_charter(&self, draft: &CharterDraft) -> DatabaseResult<Charter> {
        let now = now_string();
        self.conn().execute(
            "INSERT INTO charters (id, name, boat_name, destination, start_date, end_date, guests, notes, visibility, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                boat_name = excluded.boat_name,
                destination = excluded.destination,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                guests = excluded.guests,
                notes = excluded.notes,
                visibility = excluded.visibility,
                updated_at = excluded.updated_at",
            params![
                draft.id,
                draft.name,
                draft.boat_name,
                draft.destination,
                format_date(draft.start_date),
                format_date(draft.end_date),
                draft.guests,
                draft.notes,
                draft.visibility.as_str(),
                now,
            ],
        )?;
        self.get_charter(&draft.id)?
            .ok_or_else(|| DatabaseError::NotFound("Charter not found after save".to_string()))
    }

    /// Get a charter by ID.
    pub fn get_charter(&self, id: &str) -> DatabaseResult<Option<Charter>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHARTER_COLUMNS} FROM charters WHERE id = ?1"
        ))?;

        match stmt.query_row(params![id], charter_from_row) {
            Ok(charter) => Ok(Some(charter)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List charters ordered by start date.
    pub fn list_charters(&self) -> DatabaseResult<Vec<Charter>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHARTER_COLUMNS} FROM charters ORDER BY start_date ASC, id ASC"
        ))?;
        let charters = stmt
            .query_map([], charter_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(charters)
    }

    /// Record the server id of a charter, and the server's `updated_at` when
    /// it sent one. User-edited fields are left alone.
    pub fn set_charter_remote_id(
        &self,
        id: &str,
        remote_id: &str,
        updated_at: Option<DateTime<Utc>>,
    ) -> DatabaseResult<bool> {
        let updated = self.conn().execute(
            "UPDATE charters SET remote_id = ?2, updated_at = COALESCE(?3, updated_at) WHERE id = ?1",
            params![id, remote_id, updated_at.map(format_datetime)],
        )?;
        Ok(updated > 0)
    }

    /// Set the sync status of a charter. Returns false if no charter matched.
    pub fn set_charter_sync_status(&self, id: &str, status: SyncStatus) -> DatabaseResult<bool> {
        let updated = self.conn().execute(
            "UPDATE charters SET sync_status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(updated > 0)
    }
}

// ==========================================
// Row mapping helpers
// ==========================================

fn content_item_from_row(row: &Row<'_>) -> rusqlite::Result<ContentItem> {
    let body: String = row.get(3)?;
    let tags: String = row.get(4)?;
    Ok(ContentItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        body: parse_json::<ContentBody>(3, &body)?,
        tags: parse_json::<Vec<String>>(4, &tags)?,
        language: row.get(5)?,
        visibility: parse_text(6, row.get::<_, String>(6)?, Visibility::parse)?,
        sync_status: parse_text(7, row.get::<_, String>(7)?, SyncStatus::parse)?,
        public_id: row.get(8)?,
        published_at: parse_optional_datetime(9, row.get(9)?)?,
        can_fork: row.get(10)?,
        author_username: row.get(11)?,
        forked_from_id: row.get(12)?,
        created_at: parse_datetime(13, row.get(13)?)?,
        updated_at: parse_datetime(14, row.get(14)?)?,
    })
}

fn charter_from_row(row: &Row<'_>) -> rusqlite::Result<Charter> {
    Ok(Charter {
        id: row.get(0)?,
        name: row.get(1)?,
        boat_name: row.get(2)?,
        destination: row.get(3)?,
        start_date: parse_date(4, row.get::<_, String>(4)?)?,
        end_date: parse_date(5, row.get::<_, String>(5)?)?,
        guests: row.get(6)?,
        notes: row.get(7)?,
        visibility: parse_text(8, row.get::<_, String>(8)?, Visibility::parse)?,
        remote_id: row.get(9)?,
        sync_status: parse_text(10, row.get::<_, String>(10)?, SyncStatus::parse)?,
        created_at: parse_datetime(11, row.get(11)?)?,
        updated_at: parse_datetime(12, row.get(12)?)?,
    })
}

/// Map a stored enum string back to its type, failing the row on garbage.
pub(crate) fn parse_text<T>(
    idx: usize,
    value: String,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value '{value}'").into(),
        )
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_date(idx: usize, value: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_string() -> String {
    format_datetime(Utc::now())
}

/// Parse a stored timestamp, failing the row instead of guessing.
pub(crate) fn parse_datetime(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_optional_datetime(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_datetime(idx, v)).transpose()
}
