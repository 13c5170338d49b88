//! # Error Module
//!
//! Error types for the listing scanner.
//!
//! ## Design Principles
//! - **Never panic** on marketplace data - return errors instead
//! - **Include context** - item ids, URLs, what went wrong
//! - **Keep the run alive** - most failures are per-image or per-candidate
//!   and are counted rather than propagated

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Marketplace error: {0}")]
    Market(#[from] MarketError),

    #[error("Image fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Report generation error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the marketplace collaborator.
///
/// The marketplace client lives outside this crate; implementations of
/// [`crate::core::market::Marketplace`] translate their transport failures
/// into these variants.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("search failed for {query:?}: {message}")]
    SearchFailed { query: String, message: String },

    #[error("failed to fetch listing {item_id}: {message}")]
    ListingFetch { item_id: String, message: String },

    #[error("marketplace unavailable: {0}")]
    Unavailable(String),
}

/// Errors that occur while downloading candidate images
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    BadStatus { url: String, status: u16 },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("failed to build download pool: {0}")]
    Pool(String),
}

/// Errors that occur with the persistent state database
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open state database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("state database lock poisoned")]
    LockPoisoned,
}

/// Errors that occur during report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode CSV row: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read detections for report: {0}")]
    Store(#[from] StoreError),
}

/// Errors that occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SentinelError>;
