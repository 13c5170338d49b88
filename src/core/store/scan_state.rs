//! Per-listing scan bookkeeping, the data behind fair batch selection

use super::{now_timestamp, parse_timestamp, ScanStateRow, Store};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

impl Store {
    /// Record that a listing was scanned in this run with the given status
    pub fn record_scan(
        &self,
        listing_item_id: &str,
        run_id: &str,
        status: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO listings_scan_state
                (listing_item_id, last_scanned_at, last_scanned_run_id, last_scan_status)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(listing_item_id) DO UPDATE SET
                last_scanned_at = excluded.last_scanned_at,
                last_scanned_run_id = excluded.last_scanned_run_id,
                last_scan_status = excluded.last_scan_status",
            params![listing_item_id, now_timestamp(), run_id, status],
        )?;
        Ok(())
    }

    pub fn scan_state(
        &self,
        listing_item_id: &str,
    ) -> Result<Option<ScanStateRow>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT listing_item_id, last_scanned_at, last_scanned_run_id,
                        last_scan_status
                 FROM listings_scan_state WHERE listing_item_id = ?1",
                params![listing_item_id],
                |row| {
                    let last_scanned_at: Option<String> = row.get(1)?;
                    Ok(ScanStateRow {
                        listing_item_id: row.get(0)?,
                        last_scanned_at: last_scanned_at
                            .as_deref()
                            .and_then(parse_timestamp),
                        last_scanned_run_id: row.get(2)?,
                        last_scan_status: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Last-scanned timestamps for every known listing, keyed by item id.
    /// A listing absent from the map has never been scanned; a `None` value
    /// means its row exists but carries no timestamp.
    pub fn scan_timestamps(
        &self,
    ) -> Result<HashMap<String, Option<DateTime<Utc>>>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT listing_item_id, last_scanned_at FROM listings_scan_state")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let ts: Option<String> = row.get(1)?;
            Ok((id, ts))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (id, ts) = row?;
            map.insert(id, ts.as_deref().and_then(parse_timestamp));
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_scan_inserts_then_updates() {
        let store = Store::open_in_memory().unwrap();
        store.create_run("run-1").unwrap();
        store.create_run("run-2").unwrap();

        store.record_scan("item-1", "run-1", "success").unwrap();
        let first = store.scan_state("item-1").unwrap().unwrap();
        assert_eq!(first.last_scanned_run_id.as_deref(), Some("run-1"));
        assert_eq!(first.last_scan_status.as_deref(), Some("success"));

        store.record_scan("item-1", "run-2", "partial").unwrap();
        let second = store.scan_state("item-1").unwrap().unwrap();
        assert_eq!(second.last_scanned_run_id.as_deref(), Some("run-2"));
        assert_eq!(second.last_scan_status.as_deref(), Some("partial"));
        assert!(second.last_scanned_at >= first.last_scanned_at);
    }

    #[test]
    fn scan_timestamps_cover_all_known_listings() {
        let store = Store::open_in_memory().unwrap();
        store.create_run("run-1").unwrap();
        store.record_scan("item-1", "run-1", "success").unwrap();
        store.record_scan("item-2", "run-1", "fail").unwrap();

        let map = store.scan_timestamps().unwrap();
        assert_eq!(map.len(), 2);
        assert!(map["item-1"].is_some());
        assert!(!map.contains_key("item-3"));
    }
}
