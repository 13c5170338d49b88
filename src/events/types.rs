//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by the scan pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Run-level events
    Run(RunEvent),
    /// Per-listing events
    Listing(ListingEvent),
}

/// Run lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    /// A run has started
    Started { run_id: String },
    /// Listing selection finished
    ListingsSelected { run_id: String, selected: usize },
    /// The run completed normally
    Completed { run_id: String, detections_new: u64 },
    /// The run stopped early on a cancellation request
    Cancelled { run_id: String },
    /// The run aborted on an unrecoverable error
    Error { run_id: String, message: String },
}

/// Events while one listing is being scanned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ListingEvent {
    /// Work on a listing has started
    Started { item_id: String },
    /// One of the listing's images finished its candidate sweep
    ImageScanned {
        item_id: String,
        image_index: usize,
        candidates_checked: usize,
    },
    /// A new detection was persisted
    DetectionRecorded {
        your_item_id: String,
        infringing_item_id: String,
        evidence: String,
    },
    /// An error was counted but the listing continues
    Error { item_id: String, message: String },
    /// The listing finished with the given scan status
    Completed { item_id: String, status: String },
}
