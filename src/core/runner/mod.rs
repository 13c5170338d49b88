//! # Runner Module
//!
//! Owns the run lifecycle: creates the run row, selects listings, walks
//! them sequentially through the processor, and closes the run out.
//!
//! Listings are deliberately processed one at a time; parallelism lives
//! inside a listing (candidate downloads), where it cannot reorder the
//! per-listing bookkeeping.

use crate::config::ScanConfig;
use crate::core::market::{AccessToken, Listing};
use crate::core::processor::{process_listing, PipelineDeps};
use crate::core::scheduler::{select_fair, select_from_beginning, SelectionMode};
use crate::core::store::RunCounters;
use crate::error::{Result, SentinelError};
use crate::events::{Event, EventSender, RunEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Cooperative cancellation flag, checked between listings.
///
/// Cancellation never interrupts a listing mid-scan; whatever was already
/// persisted stays persisted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Final accounting for one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub listings_selected: usize,
    pub counters: RunCounters,
    pub cancelled: bool,
}

/// Execute one scan run to completion (or cancellation).
///
/// `suspect_item_ids` names candidate listings to compare against
/// explicitly, on top of whatever the search channels surface.
pub fn run_once(
    deps: &PipelineDeps<'_>,
    token: &AccessToken,
    config: &ScanConfig,
    mode: &SelectionMode,
    suspect_item_ids: &[String],
    cancel: &CancellationToken,
    events: &EventSender,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4().to_string();
    deps.store.create_run(&run_id)?;
    info!(run_id = %run_id, "run started");
    events.send(Event::Run(RunEvent::Started {
        run_id: run_id.clone(),
    }));

    // Explicitly named listings bypass the own-seller sanity check
    let mut config = config.clone();
    if matches!(mode, SelectionMode::ExplicitList(_)) {
        config.run.skip_seller_check = true;
    }
    let config = &config;

    let mut counters = RunCounters::default();
    let mut notes: Vec<String> = Vec::new();

    let listings = match select_listings(deps, token, config, mode, &run_id, &mut counters, &mut notes)
    {
        Ok(listings) => listings,
        Err(e) => {
            error!(run_id = %run_id, error = %e, "listing selection failed");
            deps.store
                .set_run_notes(&run_id, &format!("selection failed: {e}"))?;
            deps.store.finish_run(&run_id)?;
            events.send(Event::Run(RunEvent::Error {
                run_id: run_id.clone(),
                message: e.to_string(),
            }));
            return Err(e);
        }
    };
    events.send(Event::Run(RunEvent::ListingsSelected {
        run_id: run_id.clone(),
        selected: listings.len(),
    }));

    let mut cancelled = false;
    for listing in &listings {
        if cancel.is_cancelled() {
            cancelled = true;
            warn!(run_id = %run_id, "run cancelled");
            notes.push("cancelled before completion".to_string());
            break;
        }

        let report = match process_listing(
            deps,
            token,
            &run_id,
            listing,
            suspect_item_ids,
            config,
            events,
        ) {
            Ok(report) => report,
            Err(e) => {
                // The store is unusable; close the run out as best we can.
                error!(run_id = %run_id, item_id = %listing.item_id, error = %e, "store failure, aborting run");
                notes.push(format!("aborted on store failure: {e}"));
                let _ = deps.store.set_run_notes(&run_id, &notes.join("; "));
                let _ = deps.store.finish_run(&run_id);
                events.send(Event::Run(RunEvent::Error {
                    run_id: run_id.clone(),
                    message: e.to_string(),
                }));
                return Err(SentinelError::Store(e));
            }
        };

        counters.scanned_listings += 1;
        counters.scanned_images += report.images_scanned;
        counters.candidates_checked += report.candidates_checked;
        counters.detections_new += report.detections_new;
        counters.errors += report.errors;

        // Persist progress after every listing so a crash loses at most
        // one listing's counters.
        deps.store.update_run_counters(&run_id, &counters)?;
    }

    deps.store.update_run_counters(&run_id, &counters)?;
    if !notes.is_empty() {
        deps.store.set_run_notes(&run_id, &notes.join("; "))?;
    }
    deps.store.finish_run(&run_id)?;

    if cancelled {
        events.send(Event::Run(RunEvent::Cancelled {
            run_id: run_id.clone(),
        }));
    } else {
        events.send(Event::Run(RunEvent::Completed {
            run_id: run_id.clone(),
            detections_new: counters.detections_new,
        }));
    }
    info!(
        run_id = %run_id,
        listings = counters.scanned_listings,
        detections = counters.detections_new,
        errors = counters.errors,
        cancelled,
        "run finished"
    );

    Ok(RunSummary {
        run_id,
        listings_selected: listings.len(),
        counters,
        cancelled,
    })
}

/// Resolve the selection mode into concrete listings to scan
fn select_listings(
    deps: &PipelineDeps<'_>,
    token: &AccessToken,
    config: &ScanConfig,
    mode: &SelectionMode,
    run_id: &str,
    counters: &mut RunCounters,
    notes: &mut Vec<String>,
) -> Result<Vec<Listing>> {
    let limit = config.run.max_listings_per_run;

    match mode {
        SelectionMode::ExplicitList(item_ids) => {
            let mut listings = Vec::new();
            for raw_id in item_ids {
                let item_id = raw_id.trim();
                if item_id.is_empty() {
                    continue;
                }
                if listings.len() >= limit {
                    break;
                }
                match deps.market.fetch_listing(token, item_id) {
                    Ok(Some(listing)) => listings.push(listing),
                    Ok(None) => {
                        warn!(item_id, "requested listing not found");
                        deps.store.record_scan(item_id, run_id, "fail")?;
                        counters.errors += 1;
                        notes.push(format!("listing {item_id} not found"));
                    }
                    Err(e) => {
                        warn!(item_id, error = %e, "requested listing fetch failed");
                        deps.store.record_scan(item_id, run_id, "fail")?;
                        counters.errors += 1;
                        notes.push(format!("listing {item_id} fetch failed"));
                    }
                }
            }
            Ok(listings)
        }
        SelectionMode::Continue | SelectionMode::FromBeginning => {
            // Discovery is wider than the per-run cap so fair rotation
            // can reach listings beyond the first batch.
            let discovery = config.run.discovery_budget.max(limit);
            let discovered = deps
                .market
                .list_my_listings(token, discovery)
                .map_err(SentinelError::Market)?;
            let discovered_ids: Vec<String> =
                discovered.iter().map(|l| l.item_id.clone()).collect();

            let selected_ids = match mode {
                SelectionMode::Continue => {
                    let history = deps.store.scan_timestamps()?;
                    select_fair(&discovered_ids, &history, limit)
                }
                _ => select_from_beginning(&discovered_ids, limit),
            };

            let mut by_id: std::collections::HashMap<&str, &Listing> = discovered
                .iter()
                .map(|l| (l.item_id.as_str(), l))
                .collect();
            Ok(selected_ids
                .iter()
                .filter_map(|id| by_id.remove(id.as_str()).cloned())
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetcher::ImageFetcher;
    use crate::core::hasher::FingerprintEngine;
    use crate::core::market::Marketplace;
    use crate::core::store::Store;
    use crate::error::{FetchError, MarketError};
    use crate::events::null_sender;

    struct EmptyMarket;

    impl Marketplace for EmptyMarket {
        fn search_by_image(
            &self,
            _token: &AccessToken,
            _image: &[u8],
            _limit: usize,
        ) -> std::result::Result<Vec<Listing>, MarketError> {
            Ok(Vec::new())
        }

        fn search_by_keywords(
            &self,
            _token: &AccessToken,
            _query: &str,
            _limit: usize,
        ) -> std::result::Result<Vec<Listing>, MarketError> {
            Ok(Vec::new())
        }

        fn fetch_listing(
            &self,
            _token: &AccessToken,
            _item_id: &str,
        ) -> std::result::Result<Option<Listing>, MarketError> {
            Ok(None)
        }

        fn list_my_listings(
            &self,
            _token: &AccessToken,
            _batch_hint: usize,
        ) -> std::result::Result<Vec<Listing>, MarketError> {
            Ok(Vec::new())
        }
    }

    struct NoFetch;

    impl ImageFetcher for NoFetch {
        fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            Err(FetchError::EmptyBody {
                url: url.to_string(),
            })
        }
    }

    fn test_deps<'a>(store: &'a Store, engine: &'a FingerprintEngine) -> PipelineDeps<'a> {
        // leaks are fine in tests, the statics live for the process
        PipelineDeps {
            market: Box::leak(Box::new(EmptyMarket)),
            fetcher: Box::leak(Box::new(NoFetch)),
            store,
            engine,
        }
    }

    #[test]
    fn empty_inventory_finishes_cleanly() {
        let store = Store::open_in_memory().unwrap();
        let engine = FingerprintEngine::new();
        let deps = test_deps(&store, &engine);

        let summary = run_once(
            &deps,
            &AccessToken::new("t"),
            &ScanConfig::default(),
            &SelectionMode::Continue,
            &[],
            &CancellationToken::new(),
            &null_sender(),
        )
        .unwrap();

        assert_eq!(summary.listings_selected, 0);
        assert!(!summary.cancelled);
        let run = store.get_run(&summary.run_id).unwrap().unwrap();
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn explicit_ids_that_resolve_to_nothing_count_as_errors() {
        let store = Store::open_in_memory().unwrap();
        let engine = FingerprintEngine::new();
        let deps = test_deps(&store, &engine);

        let summary = run_once(
            &deps,
            &AccessToken::new("t"),
            &ScanConfig::default(),
            &SelectionMode::ExplicitList(vec!["ghost-1".to_string(), "ghost-2".to_string()]),
            &[],
            &CancellationToken::new(),
            &null_sender(),
        )
        .unwrap();

        assert_eq!(summary.listings_selected, 0);
        assert_eq!(summary.counters.errors, 2);

        let run = store.get_run(&summary.run_id).unwrap().unwrap();
        assert_eq!(run.errors, 2);
        assert!(run.notes.unwrap().contains("ghost-1"));

        let state = store.scan_state("ghost-1").unwrap().unwrap();
        assert_eq!(state.last_scan_status.as_deref(), Some("fail"));
    }

    #[test]
    fn pre_cancelled_run_scans_nothing_and_still_finishes() {
        let store = Store::open_in_memory().unwrap();
        let engine = FingerprintEngine::new();
        let deps = test_deps(&store, &engine);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = run_once(
            &deps,
            &AccessToken::new("t"),
            &ScanConfig::default(),
            &SelectionMode::ExplicitList(vec![]),
            &[],
            &cancel,
            &null_sender(),
        )
        .unwrap();

        assert_eq!(summary.counters.scanned_listings, 0);
        let run = store.get_run(&summary.run_id).unwrap().unwrap();
        assert!(run.finished_at.is_some());
    }
}
