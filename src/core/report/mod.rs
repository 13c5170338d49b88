//! # Report Module
//!
//! CSV export of stored detections, for review in a spreadsheet before
//! notices go out.

use crate::core::store::{DetectionRow, Store};
use crate::error::ReportError;
use std::io::Write;
use std::path::Path;

const HEADERS: &[&str] = &[
    "detection_id",
    "run_id",
    "detected_at",
    "status",
    "your_item_id",
    "your_item_url",
    "your_image_index",
    "your_image_url",
    "infringing_item_id",
    "infringing_item_url",
    "infringing_seller",
    "infringing_image_url",
    "match_evidence",
];

/// Write the detections of one run as CSV to `writer`
pub fn write_run_report<W: Write>(
    store: &Store,
    run_id: &str,
    writer: W,
) -> Result<usize, ReportError> {
    let detections = store.detections_by_run(run_id)?;
    write_csv(&detections, writer)
}

/// Write the detections of one run as CSV to a file
pub fn write_run_report_file(
    store: &Store,
    run_id: &str,
    path: &Path,
) -> Result<usize, ReportError> {
    let file = std::fs::File::create(path).map_err(ReportError::Write)?;
    write_run_report(store, run_id, file)
}

/// Write detection rows as CSV, header first. Returns the row count.
pub fn write_csv<W: Write>(detections: &[DetectionRow], writer: W) -> Result<usize, ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADERS)?;

    for d in detections {
        csv_writer.write_record([
            d.detection_id.to_string().as_str(),
            &d.run_id,
            &d.detected_at.to_rfc3339(),
            d.status.as_str(),
            &d.your_item_id,
            &d.your_item_url,
            d.your_image_index.to_string().as_str(),
            &d.your_image_url,
            &d.infringing_item_id,
            &d.infringing_item_url,
            &d.infringing_seller_display,
            &d.infringing_image_url,
            &d.match_evidence,
        ])?;
    }
    csv_writer.flush().map_err(ReportError::Write)?;
    Ok(detections.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::NewDetection;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.create_run("run-1").unwrap();
        store
            .insert_detection(&NewDetection {
                run_id: "run-1",
                your_item_id: "item-a",
                your_item_url: "https://market.example.com/itm/item-a",
                your_image_index: 0,
                your_image_url: "https://img.example.com/a.jpg",
                your_image_digest: "aaaa",
                infringing_item_id: "item-b",
                infringing_item_url: "https://market.example.com/itm/item-b",
                infringing_seller_display: "copycat, inc",
                infringing_image_url: "https://img.example.com/b.jpg",
                infringing_image_digest: "bbbb",
                match_evidence: "content",
                message_subject: None,
                message_body: None,
            })
            .unwrap();
        store
    }

    #[test]
    fn report_has_header_and_one_row_per_detection() {
        let store = seeded_store();
        let mut buffer = Vec::new();

        let count = write_run_report(&store, "run-1", &mut buffer).unwrap();
        assert_eq!(count, 1);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("detection_id,run_id"));
        assert!(lines[1].contains("item-b"));
        // comma in the seller name gets quoted
        assert!(lines[1].contains("\"copycat, inc\""));
    }

    #[test]
    fn unknown_run_yields_header_only() {
        let store = seeded_store();
        let mut buffer = Vec::new();

        let count = write_run_report(&store, "no-such-run", &mut buffer).unwrap();
        assert_eq!(count, 0);

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
