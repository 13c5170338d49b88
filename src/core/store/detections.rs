//! Detection record queries.
//!
//! The UNIQUE(your_item_id, infringing_item_id) constraint is the
//! idempotence mechanism: re-scanning a listing re-derives the same pairs
//! and the insert silently collapses into the existing row.

use super::{now_timestamp, parse_timestamp, DetectionRow, DetectionStatus, NewDetection, Store};
use crate::error::StoreError;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};

fn row_to_detection(row: &Row<'_>) -> rusqlite::Result<DetectionRow> {
    let detected_at: String = row.get("detected_at")?;
    let status: String = row.get("status")?;
    Ok(DetectionRow {
        detection_id: row.get("detection_id")?,
        run_id: row.get("run_id")?,
        detected_at: parse_timestamp(&detected_at).unwrap_or_default(),
        your_item_id: row.get("your_item_id")?,
        your_item_url: row.get("your_item_url")?,
        your_image_index: row.get::<_, i64>("your_image_index")? as usize,
        your_image_url: row.get("your_image_url")?,
        your_image_digest: row.get("your_image_digest")?,
        infringing_item_id: row.get("infringing_item_id")?,
        infringing_item_url: row.get("infringing_item_url")?,
        infringing_seller_display: row.get("infringing_seller_display")?,
        infringing_image_url: row.get("infringing_image_url")?,
        infringing_image_digest: row.get("infringing_image_digest")?,
        match_evidence: row.get("match_evidence")?,
        status: DetectionStatus::parse(&status),
        message_subject: row.get("message_subject")?,
        message_body: row.get("message_body")?,
    })
}

impl Store {
    /// Whether a detection already exists for this (your, infringing) pair
    pub fn detection_exists(
        &self,
        your_item_id: &str,
        infringing_item_id: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM detections
             WHERE your_item_id = ?1 AND infringing_item_id = ?2",
            params![your_item_id, infringing_item_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a detection. Returns the new row id, or `None` when the pair
    /// is already recorded.
    pub fn insert_detection(
        &self,
        detection: &NewDetection<'_>,
    ) -> Result<Option<i64>, StoreError> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO detections (
                run_id, detected_at,
                your_item_id, your_item_url, your_image_index,
                your_image_url, your_image_digest,
                infringing_item_id, infringing_item_url,
                infringing_seller_display, infringing_image_url,
                infringing_image_digest,
                match_evidence, message_subject, message_body
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                detection.run_id,
                now_timestamp(),
                detection.your_item_id,
                detection.your_item_url,
                detection.your_image_index as i64,
                detection.your_image_url,
                detection.your_image_digest,
                detection.infringing_item_id,
                detection.infringing_item_url,
                detection.infringing_seller_display,
                detection.infringing_image_url,
                detection.infringing_image_digest,
                detection.match_evidence,
                detection.message_subject,
                detection.message_body,
            ],
        );

        match result {
            Ok(_) => Ok(Some(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_detection(&self, detection_id: i64) -> Result<Option<DetectionRow>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT * FROM detections WHERE detection_id = ?1",
                params![detection_id],
                row_to_detection,
            )
            .optional()?;
        Ok(row)
    }

    /// All detections recorded during one run, oldest first
    pub fn detections_by_run(&self, run_id: &str) -> Result<Vec<DetectionRow>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM detections WHERE run_id = ?1 ORDER BY detection_id ASC",
        )?;
        let rows = stmt.query_map(params![run_id], row_to_detection)?;
        let mut detections = Vec::new();
        for row in rows {
            detections.push(row?);
        }
        Ok(detections)
    }

    /// Detections filtered by status, newest first
    pub fn detections_with_status(
        &self,
        status: DetectionStatus,
        limit: usize,
    ) -> Result<Vec<DetectionRow>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM detections WHERE status = ?1
             ORDER BY detection_id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![status.as_str(), limit as i64], row_to_detection)?;
        let mut detections = Vec::new();
        for row in rows {
            detections.push(row?);
        }
        Ok(detections)
    }

    /// Update a detection's status. Returns whether the row existed.
    pub fn update_detection_status(
        &self,
        detection_id: i64,
        status: DetectionStatus,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE detections SET status = ?1 WHERE detection_id = ?2",
            params![status.as_str(), detection_id],
        )?;
        Ok(changed > 0)
    }
}
