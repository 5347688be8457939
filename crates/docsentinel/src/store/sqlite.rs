//! SQLite-backed durable store for scan results and review feedback.
//!
//! One database file, two tables. Nested collections (findings, suggestions)
//! are stored as JSON columns; the query patterns here never need to index
//! into them.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::feedback::{FeedbackEntry, FeedbackStore};
use crate::store::{ResultStore, ScanRecord};

/// Durable [`ResultStore`] + [`FeedbackStore`] over a single SQLite file.
///
/// The connection is mutex-guarded; writers are the worker threads and the
/// review surface, neither of which is latency-sensitive enough to justify a
/// pool.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS scan_results (
                scan_id      TEXT PRIMARY KEY,
                triggered_at TEXT NOT NULL,
                record       TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS review_feedback (
                issue_key  TEXT PRIMARY KEY,
                category   TEXT NOT NULL,
                timestamp  TEXT NOT NULL,
                entry      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_results_triggered
                ON scan_results (triggered_at DESC);
            CREATE INDEX IF NOT EXISTS idx_feedback_recency
                ON review_feedback (timestamp DESC);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ResultStore for SqliteStore {
    fn save(&self, record: &ScanRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute(
            "INSERT INTO scan_results (scan_id, triggered_at, record)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(scan_id) DO UPDATE SET
                 triggered_at = excluded.triggered_at,
                 record = excluded.record",
            params![
                record.scan_id,
                record.triggered_at.to_rfc3339(),
                json
            ],
        )?;
        log::info!("Saved scan result: {}", record.scan_id);
        Ok(())
    }

    fn get_recent(&self, limit: usize) -> Result<Vec<ScanRecord>, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT record FROM scan_results ORDER BY triggered_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn get(&self, scan_id: &str) -> Result<Option<ScanRecord>, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM scan_results WHERE scan_id = ?1",
                params![scan_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, scan_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let affected = conn.execute(
            "DELETE FROM scan_results WHERE scan_id = ?1",
            params![scan_id],
        )?;
        if affected > 0 {
            log::info!("Deleted scan result: {}", scan_id);
        }
        Ok(affected > 0)
    }
}

impl FeedbackStore for SqliteStore {
    fn append(&self, entry: FeedbackEntry) -> Result<(), StoreError> {
        let json = serde_json::to_string(&entry)?;
        let conn = self.conn.lock().expect("store lock poisoned");
        // Same key overwrites: an idempotent re-persist, not an edit of the
        // learning log (the entry body carries its own decision history).
        conn.execute(
            "INSERT INTO review_feedback (issue_key, category, timestamp, entry)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(issue_key) DO UPDATE SET
                 category = excluded.category,
                 timestamp = excluded.timestamp,
                 entry = excluded.entry",
            params![
                entry.issue_key,
                entry.category,
                entry.timestamp.to_rfc3339(),
                json
            ],
        )?;
        Ok(())
    }

    fn query_recent(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");

        let mut entries = Vec::new();
        match category {
            Some(category) => {
                let mut stmt = conn.prepare(
                    "SELECT entry FROM review_feedback WHERE category = ?1
                     ORDER BY timestamp DESC LIMIT ?2",
                )?;
                let rows =
                    stmt.query_map(params![category, limit as i64], |row| {
                        row.get::<_, String>(0)
                    })?;
                for row in rows {
                    entries.push(serde_json::from_str(&row?)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT entry FROM review_feedback ORDER BY timestamp DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;
                for row in rows {
                    entries.push(serde_json::from_str(&row?)?);
                }
            }
        }
        Ok(entries)
    }
}
