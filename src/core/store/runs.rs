//! Run history queries

use super::{now_timestamp, parse_timestamp, RunCounters, RunRow, Store};
use crate::error::StoreError;
use rusqlite::{params, OptionalExtension, Row};

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRow> {
    let started_at: String = row.get("started_at")?;
    let finished_at: Option<String> = row.get("finished_at")?;
    Ok(RunRow {
        run_id: row.get("run_id")?,
        started_at: parse_timestamp(&started_at).unwrap_or_default(),
        finished_at: finished_at.as_deref().and_then(parse_timestamp),
        scanned_listings: row.get::<_, i64>("scanned_listings_count")? as u64,
        scanned_images: row.get::<_, i64>("scanned_images_count")? as u64,
        candidates_checked: row.get::<_, i64>("candidates_checked_count")? as u64,
        detections_new: row.get::<_, i64>("detections_new_count")? as u64,
        errors: row.get::<_, i64>("errors_count")? as u64,
        notes: row.get("notes")?,
    })
}

impl Store {
    /// Record the start of a new run
    pub fn create_run(&self, run_id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (run_id, started_at) VALUES (?1, ?2)",
            params![run_id, now_timestamp()],
        )?;
        Ok(())
    }

    /// Overwrite a run's aggregate counters
    pub fn update_run_counters(
        &self,
        run_id: &str,
        counters: &RunCounters,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE runs SET
                scanned_listings_count = ?1,
                scanned_images_count = ?2,
                candidates_checked_count = ?3,
                detections_new_count = ?4,
                errors_count = ?5
             WHERE run_id = ?6",
            params![
                counters.scanned_listings as i64,
                counters.scanned_images as i64,
                counters.candidates_checked as i64,
                counters.detections_new as i64,
                counters.errors as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    /// Attach a human-readable note to a run (cancellation reason, explicit
    /// listing ids that could not be resolved).
    pub fn set_run_notes(&self, run_id: &str, notes: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE runs SET notes = ?1 WHERE run_id = ?2",
            params![notes, run_id],
        )?;
        Ok(())
    }

    /// Stamp finished_at if it is not already set. Returns whether this
    /// call set it; a run finishes exactly once.
    pub fn finish_run(&self, run_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE runs SET finished_at = ?1
             WHERE run_id = ?2 AND finished_at IS NULL",
            params![now_timestamp(), run_id],
        )?;
        Ok(changed > 0)
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRow>, StoreError> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT * FROM runs WHERE run_id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    /// When the most recently completed run finished, if any has completed
    pub fn last_run_finished_at(
        &self,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, StoreError> {
        let conn = self.conn()?;
        let latest: Option<String> = conn.query_row(
            "SELECT MAX(finished_at) FROM runs WHERE finished_at IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(latest.as_deref().and_then(parse_timestamp))
    }

    /// Most recent runs first
    pub fn list_runs(&self, limit: usize) -> Result<Vec<RunRow>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM runs ORDER BY started_at DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], row_to_run)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    /// Delete a run together with its detections and any scan-state rows
    /// pointing at it. Returns whether the run existed.
    pub fn delete_run(&self, run_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM detections WHERE run_id = ?1",
            params![run_id],
        )?;
        tx.execute(
            "UPDATE listings_scan_state
             SET last_scanned_run_id = NULL
             WHERE last_scanned_run_id = ?1",
            params![run_id],
        )?;
        let deleted = tx.execute("DELETE FROM runs WHERE run_id = ?1", params![run_id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}
