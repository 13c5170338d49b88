//! # Core Module
//!
//! The front-end-agnostic scan engine.
//!
//! ## Modules
//! - `hasher` - Content digests and perceptual fingerprints
//! - `matcher` - Fuses fingerprints into a match decision
//! - `market` - Listing model and marketplace collaborator contract
//! - `candidates` - Builds the comparison work list per image
//! - `fetcher` - Bounded candidate image downloads
//! - `scheduler` - Fair listing selection and scan classification
//! - `store` - SQLite persistence for runs, scan state and detections
//! - `processor` - Scans one listing end to end
//! - `runner` - Run lifecycle and cancellation
//! - `notice` - Takedown message rendering
//! - `report` - CSV export of detections

pub mod candidates;
pub mod fetcher;
pub mod hasher;
pub mod market;
pub mod matcher;
pub mod notice;
pub mod processor;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use hasher::{ContentDigest, Fingerprint, FingerprintEngine, FingerprintKind, FingerprintSet};
pub use market::{AccessToken, Listing, Marketplace, Seller};
pub use matcher::{fuse, MatchEvidence, MatchThresholds};
pub use processor::{process_listing, ListingReport, PipelineDeps};
pub use runner::{run_once, CancellationToken, RunSummary};
pub use scheduler::{ScanOutcome, SelectionMode};
pub use store::{DetectionRow, DetectionStatus, RunRow, Store};
