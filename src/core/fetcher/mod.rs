//! # Fetcher Module
//!
//! Downloads candidate images under a capped worker pool.
//!
//! A failed download drops that one candidate: it is logged, omitted from
//! the result map, and never aborts the batch. Absence from the map is the
//! failure signal, not an error value. Per-request timeouts come from the
//! HTTP client; the pipeline adds no timeouts of its own.

use crate::error::FetchError;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::warn;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads a single image by URL.
///
/// Implementations own their transport policy (timeouts, retries). The
/// returned bytes are guaranteed non-empty.
pub trait ImageFetcher: Send + Sync {
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP implementation over a blocking reqwest client
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}

/// Download a set of candidate image URLs with at most `max_concurrent`
/// requests in flight.
///
/// URLs are deduplicated before downloading. The returned map contains an
/// entry only for URLs that downloaded successfully.
pub fn download_all(
    fetcher: &dyn ImageFetcher,
    urls: &[String],
    max_concurrent: usize,
) -> Result<HashMap<String, Vec<u8>>, FetchError> {
    let unique: Vec<&String> = {
        let mut seen = HashSet::new();
        urls.iter().filter(|u| seen.insert(u.as_str())).collect()
    };
    if unique.is_empty() {
        return Ok(HashMap::new());
    }

    let workers = max_concurrent.max(1).min(unique.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| FetchError::Pool(e.to_string()))?;

    let downloaded = pool.install(|| {
        unique
            .par_iter()
            .filter_map(|url| match fetcher.download(url) {
                Ok(bytes) => Some(((*url).clone(), bytes)),
                Err(e) => {
                    warn!(url = %url, error = %e, "candidate image download failed");
                    None
                }
            })
            .collect::<HashMap<String, Vec<u8>>>()
    });

    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fetcher that fails on URLs containing "bad" and records peak
    /// concurrency.
    struct FakeFetcher {
        in_flight: AtomicUsize,
        peak: Mutex<usize>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: Mutex::new(0),
            }
        }
    }

    impl ImageFetcher for FakeFetcher {
        fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut peak = self.peak.lock().unwrap();
                if current > *peak {
                    *peak = current;
                }
            }
            std::thread::sleep(Duration::from_millis(5));
            let result = if url.contains("bad") {
                Err(FetchError::EmptyBody {
                    url: url.to_string(),
                })
            } else {
                Ok(url.as_bytes().to_vec())
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn failed_downloads_are_omitted_not_fatal() {
        let fetcher = FakeFetcher::new();
        let result =
            download_all(&fetcher, &urls(&["ok-1", "bad-1", "ok-2"]), 4).unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.contains_key("ok-1"));
        assert!(result.contains_key("ok-2"));
        assert!(!result.contains_key("bad-1"));
    }

    #[test]
    fn duplicate_urls_are_fetched_once() {
        let fetcher = FakeFetcher::new();
        let result = download_all(&fetcher, &urls(&["same", "same", "same"]), 4).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let fetcher = FakeFetcher::new();
        let result = download_all(&fetcher, &[], 4).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn concurrency_never_exceeds_cap() {
        let fetcher = FakeFetcher::new();
        let many: Vec<String> = (0..20).map(|i| format!("url-{i}")).collect();

        download_all(&fetcher, &many, 3).unwrap();

        assert!(*fetcher.peak.lock().unwrap() <= 3);
    }
}
