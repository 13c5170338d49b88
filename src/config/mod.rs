//! # Config Module
//!
//! TOML configuration for the scanner. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration; the
//! operator overrides only what they care about.

use crate::core::matcher::MatchThresholds;
use crate::core::notice::NoticeConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Knobs for a single scan run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Listings processed per run, at most
    pub max_listings_per_run: usize,
    /// Inventory window discovered per run. Kept separate from the
    /// per-run cap so rotation sees the whole inventory even when only
    /// a few listings are scanned each run.
    pub discovery_budget: usize,
    /// Our own images checked per listing, at most
    pub max_images_per_listing: usize,
    /// Visual-search result budget per image
    pub candidates_per_image: usize,
    /// Keyword-search result budget per image (split across phrases)
    pub keyword_search_candidates: usize,
    /// Stop sweeping a listing's remaining images once one image matched
    pub stop_on_first_match_per_image: bool,
    /// Candidate image downloads in flight, at most
    pub max_concurrent_downloads: usize,
    /// Skip the own-seller sanity check on each listing (diagnostic use)
    pub skip_seller_check: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_listings_per_run: 1000,
            discovery_budget: 1000,
            max_images_per_listing: 3,
            candidates_per_image: 100,
            keyword_search_candidates: 100,
            stop_on_first_match_per_image: true,
            max_concurrent_downloads: 10,
            skip_seller_check: false,
        }
    }
}

/// Full scanner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Path of the SQLite state database
    pub db_path: Option<PathBuf>,
    /// Our seller identities (usernames and immutable ids), used to drop
    /// our own listings from candidate sets
    pub own_identities: Vec<String>,
    pub run: RunParams,
    pub thresholds: MatchThresholds,
    pub notice: NoticeConfig,
}

impl ScanConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from a TOML file if it exists, else defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Database path with the default applied
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("sentinel.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ScanConfig = toml::from_str("").unwrap();
        assert_eq!(config.run.max_listings_per_run, 1000);
        assert_eq!(config.run.discovery_budget, 1000);
        assert_eq!(config.run.max_images_per_listing, 3);
        assert_eq!(config.run.max_concurrent_downloads, 10);
        assert!(config.run.stop_on_first_match_per_image);
        assert_eq!(config.thresholds.phash_threshold, 20);
        assert_eq!(config.notice.deadline_hours, 24);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config: ScanConfig = toml::from_str(
            r#"
            own_identities = ["mystore", "90210"]

            [run]
            max_listings_per_run = 50

            [thresholds]
            phash_threshold = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.own_identities.len(), 2);
        assert_eq!(config.run.max_listings_per_run, 50);
        assert_eq!(config.run.candidates_per_image, 100);
        assert_eq!(config.thresholds.phash_threshold, 12);
        assert_eq!(config.thresholds.ahash_threshold, 15);
    }

    #[test]
    fn load_reads_file_and_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [").unwrap();

        let result = ScanConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let config = ScanConfig::load_or_default(Path::new("/no/such/config.toml")).unwrap();
        assert_eq!(config.db_path(), PathBuf::from("sentinel.db"));
    }
}
