//! # Processor Module
//!
//! Scans one of our listings end to end: fingerprint our images, gather
//! candidates from every discovery channel, download and fingerprint the
//! candidates, fuse, and persist detections.
//!
//! ## Error accounting
//! Failures are per-image: a download or search failure on one image is
//! counted and the sweep moves on. Only store failures abort, since a
//! run that cannot persist its findings has nothing useful to do.

use crate::config::ScanConfig;
use crate::core::candidates::{
    candidates_from_hits, keyword_candidates, suspect_candidates, Candidate, CandidateFilter,
    CandidateSet, ImagePolicy,
};
use crate::core::fetcher::{download_all, ImageFetcher};
use crate::core::hasher::FingerprintEngine;
use crate::core::market::{AccessToken, Listing, Marketplace};
use crate::core::matcher::fuse;
use crate::core::notice::compose_notice;
use crate::core::scheduler::{classify_outcome, ScanOutcome};
use crate::core::store::{NewDetection, Store};
use crate::error::StoreError;
use crate::events::{Event, EventSender, ListingEvent};
use tracing::{debug, info, warn};

/// Images pulled per candidate listing when explicit suspects are named;
/// reposts often bury the stolen photo deep in the gallery.
const SUSPECT_MODE_IMAGE_CAP: usize = 12;

/// Collaborators the processor works against
pub struct PipelineDeps<'a> {
    pub market: &'a dyn Marketplace,
    pub fetcher: &'a dyn ImageFetcher,
    pub store: &'a Store,
    pub engine: &'a FingerprintEngine,
}

/// What happened while scanning one listing
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingReport {
    pub images_scanned: u64,
    pub attempted_images: u64,
    pub candidates_checked: u64,
    pub detections_new: u64,
    pub errors: u64,
    pub outcome: ScanOutcome,
}

/// Scan one listing and persist everything it finds.
///
/// Returns the per-listing counters; the scan-state row is written before
/// returning, whatever the outcome.
pub fn process_listing(
    deps: &PipelineDeps<'_>,
    token: &AccessToken,
    run_id: &str,
    listing: &Listing,
    suspect_item_ids: &[String],
    config: &ScanConfig,
    events: &EventSender,
) -> Result<ListingReport, StoreError> {
    let item_id = listing.item_id.as_str();
    events.send(Event::Listing(ListingEvent::Started {
        item_id: item_id.to_string(),
    }));

    let mut report = ListingReport::default();

    // Sanity check that the listing really is ours before we go hunting
    // for copies of it.
    if !config.run.skip_seller_check
        && !config.own_identities.is_empty()
        && !listing.is_from_any_seller(&config.own_identities)
    {
        warn!(item_id, "listing does not belong to a configured identity");
        report.errors = 1;
        return finish(deps, run_id, item_id, report, events);
    }

    let image_cap = if suspect_item_ids.is_empty() {
        config.run.max_images_per_listing
    } else {
        config.run.max_images_per_listing.max(SUSPECT_MODE_IMAGE_CAP)
    };
    let image_urls = listing.image_urls(image_cap);
    if image_urls.is_empty() {
        warn!(item_id, "listing has no images");
        report.errors = 1;
        return finish(deps, run_id, item_id, report, events);
    }

    let filter = CandidateFilter {
        current_item_id: item_id,
        own_identities: &config.own_identities,
    };

    // Title and suspect channels do not depend on which of our images is
    // in hand, so gather them once per listing.
    let keyword_pool: Vec<Candidate> = match listing.title.as_deref() {
        Some(title) => keyword_candidates(
            deps.market,
            token,
            title,
            &filter,
            config.run.keyword_search_candidates,
        ),
        None => Vec::new(),
    };
    let suspect_pool: Vec<Candidate> = suspect_candidates(
        deps.market,
        token,
        suspect_item_ids,
        &filter,
        image_cap,
    );

    let mut listing_matched = false;
    for (image_index, image_url) in image_urls.iter().enumerate() {
        if listing_matched && config.run.stop_on_first_match_per_image {
            break;
        }
        report.attempted_images += 1;

        let our_bytes = match deps.fetcher.download(image_url) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(item_id, image_index, error = %e, "own image download failed");
                report.errors += 1;
                events.send(Event::Listing(ListingEvent::Error {
                    item_id: item_id.to_string(),
                    message: e.to_string(),
                }));
                continue;
            }
        };
        let our_prints = deps.engine.fingerprint(&our_bytes);

        let visual_hits = match deps.market.search_by_image(
            token,
            &our_bytes,
            config.run.candidates_per_image,
        ) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(item_id, image_index, error = %e, "visual search failed");
                report.errors += 1;
                events.send(Event::Listing(ListingEvent::Error {
                    item_id: item_id.to_string(),
                    message: e.to_string(),
                }));
                continue;
            }
        };

        let mut merged = CandidateSet::new();
        merged.extend(candidates_from_hits(
            &visual_hits,
            &filter,
            ImagePolicy::PrimaryOnly,
        ));
        merged.extend(keyword_pool.iter().cloned());
        merged.extend(suspect_pool.iter().cloned());
        let candidates = merged.into_vec();

        let candidate_urls: Vec<String> =
            candidates.iter().map(|c| c.image_url.clone()).collect();
        let downloaded = match download_all(
            deps.fetcher,
            &candidate_urls,
            config.run.max_concurrent_downloads,
        ) {
            Ok(map) => map,
            Err(e) => {
                warn!(item_id, image_index, error = %e, "candidate download batch failed");
                report.errors += 1;
                continue;
            }
        };

        let mut image_candidates_checked: usize = 0;
        for candidate in &candidates {
            let their_bytes = match downloaded.get(&candidate.image_url) {
                Some(bytes) => bytes,
                // download failed; already logged by the fetcher
                None => continue,
            };
            let their_prints = deps.engine.fingerprint(their_bytes);
            image_candidates_checked += 1;

            let evidence = match fuse(
                &our_prints,
                &their_prints,
                Some(image_url),
                Some(&candidate.image_url),
                &config.thresholds,
            ) {
                Some(evidence) => evidence,
                None => continue,
            };

            // Only a NEW detection ends the sweep. An already-recorded
            // pair is old news; the next candidate may be a fresh
            // infringer that appeared since the last run.
            if deps
                .store
                .detection_exists(item_id, &candidate.item_id)?
            {
                debug!(
                    item_id,
                    infringing = %candidate.item_id,
                    "detection already recorded"
                );
                continue;
            }

            let notice =
                compose_notice(&candidate.item_id, &listing.web_url, &config.notice);
            let inserted = deps.store.insert_detection(&NewDetection {
                run_id,
                your_item_id: item_id,
                your_item_url: &listing.web_url,
                your_image_index: image_index,
                your_image_url: image_url,
                your_image_digest: our_prints.digest.as_str(),
                infringing_item_id: &candidate.item_id,
                infringing_item_url: &candidate.item_web_url,
                infringing_seller_display: &candidate.seller_display,
                infringing_image_url: &candidate.image_url,
                infringing_image_digest: their_prints.digest.as_str(),
                match_evidence: &evidence.to_string(),
                message_subject: Some(&notice.subject),
                message_body: Some(&notice.body),
            })?;
            if inserted.is_none() {
                // another writer recorded the pair first
                continue;
            }

            report.detections_new += 1;
            listing_matched = true;
            info!(
                item_id,
                infringing = %candidate.item_id,
                evidence = %evidence,
                "new detection"
            );
            events.send(Event::Listing(ListingEvent::DetectionRecorded {
                your_item_id: item_id.to_string(),
                infringing_item_id: candidate.item_id.clone(),
                evidence: evidence.to_string(),
            }));

            if config.run.stop_on_first_match_per_image {
                break;
            }
        }

        report.candidates_checked += image_candidates_checked as u64;
        report.images_scanned += 1;
        events.send(Event::Listing(ListingEvent::ImageScanned {
            item_id: item_id.to_string(),
            image_index,
            candidates_checked: image_candidates_checked,
        }));
    }

    finish(deps, run_id, item_id, report, events)
}

fn finish(
    deps: &PipelineDeps<'_>,
    run_id: &str,
    item_id: &str,
    mut report: ListingReport,
    events: &EventSender,
) -> Result<ListingReport, StoreError> {
    report.outcome = classify_outcome(report.errors, report.attempted_images);
    deps.store
        .record_scan(item_id, run_id, report.outcome.as_str())?;
    events.send(Event::Listing(ListingEvent::Completed {
        item_id: item_id.to_string(),
        status: report.outcome.as_str().to_string(),
    }));
    Ok(report)
}
