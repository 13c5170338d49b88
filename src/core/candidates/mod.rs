//! # Candidates Module
//!
//! Builds the deduplicated comparison work list for one of our images by
//! merging three discovery channels:
//!
//! 1. **Visual** - hits from the marketplace's similarity search
//! 2. **Keyword** - title-derived phrase searches, which surface resized or
//!    cropped reposts that visual search misses
//! 3. **Suspect** - explicitly named listings fetched in full (manual mode)
//!
//! Every channel drops our own listings and the listing currently under
//! evaluation. Dedup key is `(item_id, image_url)`; the first occurrence
//! wins, in channel then search-result order.

use crate::core::market::{AccessToken, Listing, Marketplace};
use std::collections::HashSet;
use tracing::warn;

/// Keyword phrases derived from one title, at most
const MAX_SEARCH_PHRASES: usize = 3;

/// Leading title words used for the first phrase
const PHRASE_WORD_COUNT: usize = 8;

/// Character clip applied to each phrase
const PHRASE_MAX_CHARS: usize = 60;

/// Minimum per-phrase result budget, however many phrases there are
const PER_PHRASE_FLOOR: usize = 50;

/// Brand + product-type combinations recognized in titles. A title
/// containing both words yields an extra broad search phrase.
const BRAND_COMBOS: &[(&str, &str)] = &[
    ("dupont", "cufflinks"),
    ("dupont", "tie clip"),
    ("dupont", "ring"),
    ("cartier", "cufflinks"),
    ("tiffany", "ring"),
    ("gucci", "bracelet"),
];

/// A (listing, image URL) pair proposed for comparison against one of our
/// images. Carries the listing fields the detection record needs so the
/// full listing can be dropped after aggregation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item_id: String,
    pub item_web_url: String,
    pub seller_display: String,
    pub image_url: String,
}

/// Exclusion rules applied to every discovery channel
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter<'a> {
    /// The listing currently being evaluated; dropped to prevent
    /// self-matching
    pub current_item_id: &'a str,
    /// Our own seller identities (usernames and immutable ids)
    pub own_identities: &'a [String],
}

/// How many images each hit contributes
#[derive(Debug, Clone, Copy)]
pub enum ImagePolicy {
    /// Only the primary image (visual search hits)
    PrimaryOnly,
    /// Primary plus additional images up to the cap (keyword and suspect
    /// channels, where reposts may reorder or extend the gallery)
    UpTo(usize),
}

/// Accumulates candidates across channels with first-wins dedup
#[derive(Debug, Default)]
pub struct CandidateSet {
    seen: HashSet<(String, String)>,
    items: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one candidate; a repeat of an already-seen key is ignored
    pub fn push(&mut self, candidate: Candidate) {
        let key = (candidate.item_id.clone(), candidate.image_url.clone());
        if self.seen.insert(key) {
            self.items.push(candidate);
        }
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        for candidate in candidates {
            self.push(candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.items
    }
}

/// Turn search hits into candidates, applying the exclusion rules
pub fn candidates_from_hits(
    hits: &[Listing],
    filter: &CandidateFilter<'_>,
    policy: ImagePolicy,
) -> Vec<Candidate> {
    let mut result = Vec::new();
    for hit in hits {
        if hit.is_from_any_seller(filter.own_identities) {
            continue;
        }
        if hit.item_id == filter.current_item_id {
            continue;
        }
        let urls = match policy {
            ImagePolicy::PrimaryOnly => hit
                .image_url
                .iter()
                .filter(|u| !u.is_empty())
                .cloned()
                .collect::<Vec<_>>(),
            ImagePolicy::UpTo(max) => hit.image_urls(max),
        };
        let seller_display = hit
            .seller
            .as_ref()
            .map(|s| s.display_name())
            .unwrap_or_default();
        for url in urls {
            result.push(Candidate {
                item_id: hit.item_id.clone(),
                item_web_url: hit.web_url.clone(),
                seller_display: seller_display.clone(),
                image_url: url,
            });
        }
    }
    result
}

/// Derive up to three short search phrases from a listing title.
///
/// The first phrase is the leading words (brand and product name); brand +
/// product-type combinations add a broader phrase to catch reposts with
/// rewritten titles.
pub fn extract_search_phrases(title: &str) -> Vec<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut phrases = Vec::new();
    let leading = words
        .iter()
        .take(PHRASE_WORD_COUNT)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let leading: String = leading.chars().take(PHRASE_MAX_CHARS).collect();
    let leading = leading.trim().to_string();
    if !leading.is_empty() {
        phrases.push(leading);
    }

    let lower = trimmed.to_lowercase();
    for (brand, product) in BRAND_COMBOS {
        if lower.contains(brand) && lower.contains(product) {
            let combo = format!("{} {}", title_case(brand), title_case(product));
            if !phrases.contains(&combo) {
                phrases.push(combo);
            }
            break;
        }
    }

    phrases.truncate(MAX_SEARCH_PHRASES);
    phrases
}

fn title_case(words: &str) -> String {
    words
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keyword discovery channel: query each derived phrase independently and
/// merge the results. A failed phrase query is logged and skipped; it never
/// aborts the listing.
pub fn keyword_candidates(
    market: &dyn Marketplace,
    token: &AccessToken,
    title: &str,
    filter: &CandidateFilter<'_>,
    budget: usize,
) -> Vec<Candidate> {
    let phrases = extract_search_phrases(title);
    if phrases.is_empty() {
        return Vec::new();
    }
    let per_phrase = (budget / phrases.len()).max(PER_PHRASE_FLOOR);

    let mut merged = CandidateSet::new();
    for phrase in &phrases {
        let hits = match market.search_by_keywords(token, phrase, per_phrase) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query = %phrase, error = %e, "keyword search failed, skipping phrase");
                continue;
            }
        };
        merged.extend(candidates_from_hits(
            &hits,
            filter,
            ImagePolicy::UpTo(12),
        ));
    }
    merged.into_vec()
}

/// Suspect discovery channel: fetch each named listing in full and
/// contribute all of its images. Used in manual/diagnostic mode to compare
/// against listings that never surface in search.
pub fn suspect_candidates(
    market: &dyn Marketplace,
    token: &AccessToken,
    suspect_item_ids: &[String],
    filter: &CandidateFilter<'_>,
    max_images: usize,
) -> Vec<Candidate> {
    let mut result = Vec::new();
    for raw_id in suspect_item_ids {
        let item_id = raw_id.trim();
        if item_id.is_empty() {
            continue;
        }
        let suspect = match market.fetch_listing(token, item_id) {
            Ok(Some(listing)) => listing,
            Ok(None) => {
                warn!(item_id, "suspect listing not found");
                continue;
            }
            Err(e) => {
                warn!(item_id, error = %e, "suspect listing fetch failed");
                continue;
            }
        };
        result.extend(candidates_from_hits(
            std::slice::from_ref(&suspect),
            filter,
            ImagePolicy::UpTo(max_images),
        ));
    }
    result
}
