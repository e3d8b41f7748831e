//! SQLite-backed asset registry
//!
//! One database file under the storage root holds the original-URL →
//! cache-filename mapping, the durable error log, and the deferred task
//! queue. The mapping answers "is this already cached" without recomputing
//! hashes or touching the filesystem.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::category::Category;
use crate::error::StoreError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, StoreError>;

/// Severity of one durable error-log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Severity> {
        match s {
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mapping row: an original URL mirrored under a hashed filename.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub original_url: String,
    pub filename: String,
    pub category: Category,
    /// Unix timestamp of the most recent successful cache write.
    pub cached_at: i64,
}

/// One durable error-log row.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub id: i64,
    pub logged_at: i64,
    pub severity: Severity,
    pub message: String,
}

/// One persisted deferred-queue row. The kind stays a plain string at this
/// layer; the queue module decodes it into its task enum once, on take.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: i64,
    pub kind: String,
    pub url: String,
    pub depth: u32,
    pub retries: u32,
}

/// SQLite-backed registry of cached assets, errors, and queued tasks
pub struct Registry {
    conn: Connection,
}

impl Registry {
    /// Default database filename under a storage root.
    pub const DB_FILE: &'static str = "cdnless.db";

    /// Open or create the registry database at `db_path`.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create storage root: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Registry schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(db_path)?;
            return Self::open_at(db_path);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS asset_map (
                original_url TEXT NOT NULL,
                filename TEXT NOT NULL,
                category TEXT NOT NULL,
                cached_at INTEGER NOT NULL,
                PRIMARY KEY (filename, category)
            );

            CREATE INDEX IF NOT EXISTS idx_asset_url ON asset_map(original_url);

            CREATE TABLE IF NOT EXISTS error_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                logged_at INTEGER NOT NULL,
                severity TEXT NOT NULL,
                message TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS task_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                url TEXT NOT NULL,
                depth INTEGER NOT NULL,
                retries INTEGER NOT NULL,
                enqueued_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_queue_kind_url ON task_queue(kind, url);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn })
    }

    /// Insert or refresh the mapping row for one cached asset.
    pub fn upsert(&self, original_url: &str, filename: &str, category: Category) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT OR REPLACE INTO asset_map (original_url, filename, category, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![original_url, filename, category.as_str(), now],
        )?;
        Ok(())
    }

    /// Cache filename for `original_url` in `category`, if already mirrored.
    pub fn lookup(&self, original_url: &str, category: Category) -> Result<Option<String>> {
        let filename = self
            .conn
            .query_row(
                "SELECT filename FROM asset_map WHERE original_url = ?1 AND category = ?2",
                params![original_url, category.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(filename)
    }

    /// Remove the mapping row; true when a row was removed.
    pub fn delete(&self, original_url: &str, category: Category) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM asset_map WHERE original_url = ?1 AND category = ?2",
            params![original_url, category.as_str()],
        )?;
        Ok(deleted > 0)
    }

    /// Every mapping row, ordered by category then URL.
    pub fn list_all(&self) -> Result<Vec<AssetRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT original_url, filename, category, cached_at FROM asset_map
             ORDER BY category, original_url",
        )?;
        let rows = stmt.query_map([], |row| {
            let cat_str: String = row.get(2)?;
            let category = Category::parse(&cat_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("unknown category `{cat_str}`").into(),
                )
            })?;
            Ok(AssetRecord {
                original_url: row.get(0)?,
                filename: row.get(1)?,
                category,
                cached_at: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    pub fn asset_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM asset_map", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Append one record to the durable error log.
    pub fn log_error(&self, severity: Severity, message: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO error_log (logged_at, severity, message) VALUES (?1, ?2, ?3)",
            params![now, severity.as_str(), message],
        )?;
        Ok(())
    }

    /// Most recent error records, newest first.
    pub fn list_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, logged_at, severity, message FROM error_log
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            let sev_str: String = row.get(2)?;
            Ok(ErrorRecord {
                id: row.get(0)?,
                logged_at: row.get(1)?,
                severity: Severity::parse(&sev_str).unwrap_or(Severity::Error),
                message: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    pub fn error_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM error_log", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Drop all error records; returns how many were removed.
    pub fn clear_errors(&self) -> Result<usize> {
        let count = self.error_count()?;
        self.conn.execute("DELETE FROM error_log", [])?;
        Ok(count)
    }

    /// Enqueue a deferred task unless an identical one is already pending.
    /// Returns true when a new row was inserted.
    pub fn enqueue_task(&self, kind: &str, url: &str, depth: u32) -> Result<bool> {
        let now = Utc::now().timestamp();
        let inserted = self.conn.execute(
            "INSERT INTO task_queue (kind, url, depth, retries, enqueued_at)
             SELECT ?1, ?2, ?3, 0, ?4
             WHERE NOT EXISTS (SELECT 1 FROM task_queue WHERE kind = ?1 AND url = ?2)",
            params![kind, url, depth, now],
        )?;
        Ok(inserted > 0)
    }

    /// Re-enqueue a failed task with its retry counter already incremented.
    pub fn requeue_task(&self, kind: &str, url: &str, depth: u32, retries: u32) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO task_queue (kind, url, depth, retries, enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![kind, url, depth, retries, now],
        )?;
        Ok(())
    }

    /// Pop the oldest pending task, removing its row.
    pub fn take_next_task(&self) -> Result<Option<TaskRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, url, depth, retries FROM task_queue
                 ORDER BY id LIMIT 1",
                [],
                |row| {
                    Ok(TaskRow {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        url: row.get(2)?,
                        depth: row.get::<_, i64>(3)? as u32,
                        retries: row.get::<_, i64>(4)? as u32,
                    })
                },
            )
            .optional()?;

        if let Some(ref task) = row {
            self.conn
                .execute("DELETE FROM task_queue WHERE id = ?1", [task.id])?;
        }
        Ok(row)
    }

    pub fn pending_task_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM task_queue", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Drop all pending tasks; returns how many were removed.
    pub fn clear_tasks(&self) -> Result<usize> {
        let count = self.pending_task_count()?;
        self.conn.execute("DELETE FROM task_queue", [])?;
        Ok(count)
    }

    /// Nuke the registry database so the next open rebuilds it.
    fn nuke(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| StoreError::Io(format!("Failed to remove registry DB: {}", e)))?;
        }
        Ok(())
    }
}
