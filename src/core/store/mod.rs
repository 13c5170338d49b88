//! # Store Module
//!
//! Persistent state for the scanner: run history, per-listing scan state,
//! and detections. This schema is the only durable layout the pipeline owns.
//!
//! ## Access discipline
//! The store is written by a single run thread; there is exactly one active
//! run at a time by convention. A future multi-run deployment must add
//! explicit serialization per listing id and per (your, infringing) pair.

mod detections;
mod runs;
mod scan_state;
mod types;

pub use types::{
    DetectionRow, DetectionStatus, NewDetection, RunCounters, RunRow, ScanStateRow,
};

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Timestamps are stored as RFC 3339 UTC text so they sort correctly as
/// strings. A malformed stored value reads back as `None`.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Repository over the scanner's SQLite state database
pub struct Store {
    conn: Mutex<Connection>,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl Store {
    /// Open or create the state database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open {
                path: path.to_path_buf(),
                source: rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(e.to_string()),
                ),
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn, path.to_path_buf())
    }

    /// In-memory store, for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                scanned_listings_count INTEGER DEFAULT 0,
                scanned_images_count INTEGER DEFAULT 0,
                candidates_checked_count INTEGER DEFAULT 0,
                detections_new_count INTEGER DEFAULT 0,
                errors_count INTEGER DEFAULT 0,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS listings_scan_state (
                listing_item_id TEXT PRIMARY KEY,
                last_scanned_at TEXT,
                last_scanned_run_id TEXT,
                last_scan_status TEXT,
                FOREIGN KEY (last_scanned_run_id) REFERENCES runs(run_id)
            );

            CREATE TABLE IF NOT EXISTS detections (
                detection_id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                detected_at TEXT NOT NULL,
                your_item_id TEXT NOT NULL,
                your_item_url TEXT NOT NULL,
                your_image_index INTEGER NOT NULL,
                your_image_url TEXT NOT NULL,
                your_image_digest TEXT NOT NULL,
                infringing_item_id TEXT NOT NULL,
                infringing_item_url TEXT NOT NULL,
                infringing_seller_display TEXT NOT NULL,
                infringing_image_url TEXT NOT NULL,
                infringing_image_digest TEXT NOT NULL,
                match_evidence TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'NEW',
                message_subject TEXT,
                message_body TEXT,
                UNIQUE(your_item_id, infringing_item_id),
                FOREIGN KEY (run_id) REFERENCES runs(run_id)
            );

            CREATE INDEX IF NOT EXISTS idx_detections_run_id ON detections(run_id);
            CREATE INDEX IF NOT EXISTS idx_detections_status ON detections(status);
            CREATE INDEX IF NOT EXISTS idx_listings_scan_state_last_scanned
                ON listings_scan_state(last_scanned_at);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}
