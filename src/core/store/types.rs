//! Row types for the state database

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a stored detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionStatus {
    /// Found but not yet acted on
    New,
    /// Notice has been sent to the infringing seller
    Sent,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Sent => "SENT",
        }
    }

    /// Parse a stored status string; unknown values fall back to `New` so
    /// a hand-edited database never panics the reader.
    pub fn parse(s: &str) -> Self {
        match s {
            "SENT" => Self::Sent,
            _ => Self::New,
        }
    }
}

impl std::fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the runs table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRow {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub scanned_listings: u64,
    pub scanned_images: u64,
    pub candidates_checked: u64,
    pub detections_new: u64,
    pub errors: u64,
    pub notes: Option<String>,
}

/// Aggregate counters written back to a run row as the run progresses
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCounters {
    pub scanned_listings: u64,
    pub scanned_images: u64,
    pub candidates_checked: u64,
    pub detections_new: u64,
    pub errors: u64,
}

impl RunCounters {
    pub fn add(&mut self, other: &RunCounters) {
        self.scanned_listings += other.scanned_listings;
        self.scanned_images += other.scanned_images;
        self.candidates_checked += other.candidates_checked;
        self.detections_new += other.detections_new;
        self.errors += other.errors;
    }
}

/// One row of the listings_scan_state table
#[derive(Debug, Clone)]
pub struct ScanStateRow {
    pub listing_item_id: String,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub last_scanned_run_id: Option<String>,
    pub last_scan_status: Option<String>,
}

/// A detection about to be persisted. Borrowed because every field comes
/// straight from in-flight pipeline state.
#[derive(Debug, Clone, Copy)]
pub struct NewDetection<'a> {
    pub run_id: &'a str,
    pub your_item_id: &'a str,
    pub your_item_url: &'a str,
    pub your_image_index: usize,
    pub your_image_url: &'a str,
    pub your_image_digest: &'a str,
    pub infringing_item_id: &'a str,
    pub infringing_item_url: &'a str,
    pub infringing_seller_display: &'a str,
    pub infringing_image_url: &'a str,
    pub infringing_image_digest: &'a str,
    pub match_evidence: &'a str,
    pub message_subject: Option<&'a str>,
    pub message_body: Option<&'a str>,
}

/// One row of the detections table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRow {
    pub detection_id: i64,
    pub run_id: String,
    pub detected_at: DateTime<Utc>,
    pub your_item_id: String,
    pub your_item_url: String,
    pub your_image_index: usize,
    pub your_image_url: String,
    pub your_image_digest: String,
    pub infringing_item_id: String,
    pub infringing_item_url: String,
    pub infringing_seller_display: String,
    pub infringing_image_url: String,
    pub infringing_image_digest: String,
    pub match_evidence: String,
    pub status: DetectionStatus,
    pub message_subject: Option<String>,
    pub message_body: Option<String>,
}
