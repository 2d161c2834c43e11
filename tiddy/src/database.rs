//! SQLite database layer for notification storage
//!
//! Single `notifications` table; every operation is one statement and
//! therefore atomic on its own.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::interface::NotificationRecord;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

const RECORD_COLUMNS: &str =
    "id, packageName, appName, title, shortContent, fullContent, timestamp, isRead, isRemoved";

/// Thread-safe database wrapper using connection pooling
///
/// WAL mode lets readers proceed without blocking the single writer.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| {
                conn.execute_batch("
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA busy_timeout=5000;
                ")?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(4)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (previews and tests)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory needs single connection to maintain state
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Set up the database schema
    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;

        // Databases written by the first Android release carry `content`/`postTime`
        let has_legacy_schema = conn
            .prepare("SELECT postTime FROM notifications LIMIT 0")
            .is_ok();

        if has_legacy_schema {
            Self::migrate_from_legacy_schema(&conn)?;
            return Ok(());
        }

        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                packageName TEXT NOT NULL,
                appName TEXT NOT NULL,
                title TEXT,
                shortContent TEXT,
                fullContent TEXT,
                timestamp INTEGER NOT NULL,
                isRead INTEGER NOT NULL DEFAULT 0,
                isRemoved INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_package ON notifications(packageName);
            CREATE INDEX IF NOT EXISTS idx_notifications_timestamp ON notifications(timestamp);
        "#)?;

        Ok(())
    }

    /// Migrate the legacy layout (`content`, `postTime` and a creation-time
    /// `timestamp`) to the current one. Preserves ids and flags; the post time
    /// becomes the record timestamp.
    fn migrate_from_legacy_schema(conn: &rusqlite::Connection) -> DatabaseResult<()> {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch("ALTER TABLE notifications RENAME TO notifications_old")?;

        tx.execute_batch(r#"
            CREATE TABLE notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                packageName TEXT NOT NULL,
                appName TEXT NOT NULL,
                title TEXT,
                shortContent TEXT,
                fullContent TEXT,
                timestamp INTEGER NOT NULL,
                isRead INTEGER NOT NULL DEFAULT 0,
                isRemoved INTEGER NOT NULL DEFAULT 0
            )
        "#)?;

        let migrated = tx.execute(
            r#"INSERT INTO notifications (id, packageName, appName, title, shortContent, fullContent, timestamp, isRead, isRemoved)
               SELECT id, packageName, appName, title, content, fullContent, postTime,
                      COALESCE(isRead, 0), COALESCE(isRemoved, 0)
               FROM notifications_old"#,
            [],
        )?;

        tx.execute_batch(r#"
            DROP TABLE notifications_old;
            CREATE INDEX idx_notifications_package ON notifications(packageName);
            CREATE INDEX idx_notifications_timestamp ON notifications(timestamp);
        "#)?;

        tx.commit()?;
        info!(rows = migrated, "Migrated legacy notifications table");
        Ok(())
    }

    /// Get total number of records in the database
    pub fn count(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert a new record. Returns the new ID; `record.id` is ignored.
    pub fn insert(&self, record: &NotificationRecord) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO notifications (packageName, appName, title, shortContent, fullContent, timestamp, isRead, isRemoved)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                record.package_name,
                record.app_name,
                record.title,
                record.short_content,
                record.full_content,
                record.timestamp,
                record.is_read,
                record.is_removed,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrite the fields of an existing record. The read and removed flags
    /// are OR-ed with the stored values so they never revert.
    /// Returns the number of rows changed (0 for an unknown id).
    pub fn update(&self, record: &NotificationRecord) -> DatabaseResult<usize> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"UPDATE notifications
               SET packageName = ?1, appName = ?2, title = ?3, shortContent = ?4, fullContent = ?5,
                   timestamp = ?6, isRead = MAX(isRead, ?7), isRemoved = MAX(isRemoved, ?8)
               WHERE id = ?9"#,
            params![
                record.package_name,
                record.app_name,
                record.title,
                record.short_content,
                record.full_content,
                record.timestamp,
                record.is_read,
                record.is_removed,
                record.id,
            ],
        )?;
        Ok(changed)
    }

    /// Mark a record read. Returns false when nothing changed.
    pub fn mark_read(&self, id: i64) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE notifications SET isRead = 1 WHERE id = ?1 AND isRead = 0",
            [id],
        )?;
        Ok(changed > 0)
    }

    /// Mark every record of a package removed
    pub fn mark_removed(&self, package_name: &str) -> DatabaseResult<usize> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE notifications SET isRemoved = 1 WHERE packageName = ?1 AND isRemoved = 0",
            [package_name],
        )?;
        Ok(changed)
    }

    /// Delete a record by ID
    pub fn delete(&self, id: i64) -> DatabaseResult<usize> {
        let conn = self.get_conn()?;
        Ok(conn.execute("DELETE FROM notifications WHERE id = ?1", [id])?)
    }

    /// Delete all records
    pub fn clear_all(&self) -> DatabaseResult<usize> {
        let conn = self.get_conn()?;
        Ok(conn.execute("DELETE FROM notifications", [])?)
    }

    /// All records, newest first
    pub fn fetch_all(&self) -> DatabaseResult<Vec<NotificationRecord>> {
        self.query_records("", [])
    }

    /// Records still present on the device, newest first
    pub fn fetch_active(&self) -> DatabaseResult<Vec<NotificationRecord>> {
        self.query_records("WHERE isRemoved = 0", [])
    }

    /// Records of one package, newest first
    pub fn fetch_by_package(&self, package_name: &str) -> DatabaseResult<Vec<NotificationRecord>> {
        self.query_records("WHERE packageName = ?1", [package_name])
    }

    pub fn fetch_by_id(&self, id: i64) -> DatabaseResult<Option<NotificationRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM notifications WHERE id = ?1", RECORD_COLUMNS);
        let record = conn
            .query_row(&sql, [id], Self::row_to_record)
            .optional()?;
        Ok(record)
    }

    fn query_records<P: rusqlite::Params>(
        &self,
        where_clause: &str,
        params: P,
    ) -> DatabaseResult<Vec<NotificationRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM notifications {} ORDER BY timestamp DESC, id DESC",
            RECORD_COLUMNS, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params, Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<NotificationRecord> {
        Ok(NotificationRecord {
            id: row.get(0)?,
            package_name: row.get(1)?,
            app_name: row.get(2)?,
            title: row.get(3)?,
            short_content: row.get(4)?,
            full_content: row.get(5)?,
            timestamp: row.get(6)?,
            is_read: row.get(7)?,
            is_removed: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(package: &str, timestamp: i64) -> NotificationRecord {
        NotificationRecord {
            id: 0,
            package_name: package.to_string(),
            app_name: package.to_uppercase(),
            title: Some("title".into()),
            short_content: Some("short".into()),
            full_content: Some("full".into()),
            timestamp,
            is_read: false,
            is_removed: false,
        }
    }

    #[test]
    fn test_insert_and_fetch_ordering() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert(&record("x", 100)).unwrap();
        let b = db.insert(&record("x", 300)).unwrap();
        let c = db.insert(&record("y", 200)).unwrap();

        let ids: Vec<i64> = db.fetch_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, c, a]);
        assert_eq!(db.count().unwrap(), 3);
    }

    #[test]
    fn test_equal_timestamps_order_by_id_desc() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert(&record("x", 100)).unwrap();
        let b = db.insert(&record("y", 100)).unwrap();
        let ids: Vec<i64> = db.fetch_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_mark_read_reports_change_once() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert(&record("x", 100)).unwrap();
        assert!(db.mark_read(id).unwrap());
        assert!(!db.mark_read(id).unwrap());
        assert!(!db.mark_read(9999).unwrap());
        assert!(db.fetch_by_id(id).unwrap().unwrap().is_read);
    }

    #[test]
    fn test_mark_removed_is_bulk_by_package() {
        let db = Database::open_in_memory().unwrap();
        db.insert(&record("x", 100)).unwrap();
        db.insert(&record("x", 200)).unwrap();
        db.insert(&record("y", 300)).unwrap();

        assert_eq!(db.mark_removed("x").unwrap(), 2);
        assert_eq!(db.mark_removed("x").unwrap(), 0);
        assert!(db.fetch_by_package("x").unwrap().iter().all(|r| r.is_removed));
        assert_eq!(db.fetch_active().unwrap().len(), 1);
    }

    #[test]
    fn test_update_never_reverts_flags() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert(&record("x", 100)).unwrap();
        db.mark_read(id).unwrap();
        db.mark_removed("x").unwrap();

        let mut stored = db.fetch_by_id(id).unwrap().unwrap();
        stored.is_read = false;
        stored.is_removed = false;
        stored.title = Some("edited".into());
        assert_eq!(db.update(&stored).unwrap(), 1);

        let reloaded = db.fetch_by_id(id).unwrap().unwrap();
        assert_eq!(reloaded.title.as_deref(), Some("edited"));
        assert!(reloaded.is_read);
        assert!(reloaded.is_removed);
    }

    #[test]
    fn test_delete_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert(&record("x", 100)).unwrap();
        db.insert(&record("y", 200)).unwrap();

        assert_eq!(db.delete(id).unwrap(), 1);
        assert!(db.fetch_by_id(id).unwrap().is_none());
        assert_eq!(db.clear_all().unwrap(), 1);
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn test_null_text_fields_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let mut r = record("x", 100);
        r.title = None;
        r.short_content = None;
        r.full_content = None;
        let id = db.insert(&r).unwrap();
        let stored = db.fetch_by_id(id).unwrap().unwrap();
        assert_eq!(stored.title, None);
        assert_eq!(stored.full_content, None);
    }

    #[test]
    fn test_migrates_legacy_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(r#"
                CREATE TABLE notifications (
                    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                    packageName TEXT NOT NULL,
                    appName TEXT NOT NULL,
                    title TEXT,
                    content TEXT,
                    fullContent TEXT,
                    postTime INTEGER NOT NULL,
                    isRead INTEGER NOT NULL,
                    isRemoved INTEGER NOT NULL,
                    timestamp INTEGER NOT NULL
                );
                INSERT INTO notifications (packageName, appName, title, content, fullContent, postTime, isRead, isRemoved, timestamp)
                VALUES ('com.whatsapp', 'WhatsApp', 'Mom', 'Call me', 'Call me when you get home', 1000, 1, 0, 2000);
            "#).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let records = db.fetch_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].short_content.as_deref(), Some("Call me"));
        assert_eq!(records[0].timestamp, 1000);
        assert!(records[0].is_read);

        // New inserts work against the migrated table
        db.insert(&record("com.slack", 3000)).unwrap();
        assert_eq!(db.count().unwrap(), 2);
    }
}
