//! # Scheduler Module
//!
//! Decides which listings a run works on and how a finished listing is
//! classified. Selection is fair across runs: listings that have never
//! been scanned go first, then everyone else oldest-scan-first, so with a
//! fixed inventory and repeated capped runs every listing is eventually
//! visited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which listings a run should cover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Fair rotation: never-scanned first, then stalest first
    Continue,
    /// Ignore scan history and take listings in discovery order
    FromBeginning,
    /// Exactly these listing ids, in the given order
    ExplicitList(Vec<String>),
}

impl Default for SelectionMode {
    fn default() -> Self {
        Self::Continue
    }
}

/// How a single listing's scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOutcome {
    /// Every attempted image was processed without error
    Success,
    /// Some images errored, some were processed
    Partial,
    /// Nothing was processed, including the no-images case
    #[default]
    Fail,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a listing scan from its error and attempt counts.
///
/// A listing with zero attempted images records one error and classifies
/// as a fail, so it is retried no sooner than genuinely broken listings.
pub fn classify_outcome(errors: u64, attempted_images: u64) -> ScanOutcome {
    if errors == 0 && attempted_images > 0 {
        ScanOutcome::Success
    } else if errors > 0 && errors < attempted_images {
        ScanOutcome::Partial
    } else {
        ScanOutcome::Fail
    }
}

/// Order discovered listings for a continue-mode run and cap at `limit`.
///
/// `history` maps item id to last scan time, as returned by the store.
/// Ids absent from the map have never been scanned and keep their
/// discovery order at the front. Previously scanned ids follow, oldest
/// scan first; a history row with no timestamp sorts before any dated one.
pub fn select_fair(
    discovered_ids: &[String],
    history: &HashMap<String, Option<DateTime<Utc>>>,
    limit: usize,
) -> Vec<String> {
    let mut never_scanned = Vec::new();
    let mut scanned: Vec<(&String, Option<DateTime<Utc>>)> = Vec::new();

    for id in discovered_ids {
        match history.get(id) {
            None => never_scanned.push(id.clone()),
            Some(ts) => scanned.push((id, *ts)),
        }
    }

    // None sorts before Some, which puts timestamp-less rows first
    scanned.sort_by(|a, b| a.1.cmp(&b.1));

    never_scanned
        .into_iter()
        .chain(scanned.into_iter().map(|(id, _)| id.clone()))
        .take(limit)
        .collect()
}

/// Order discovered listings for a from-beginning run: discovery order,
/// capped at `limit`.
pub fn select_from_beginning(discovered_ids: &[String], limit: usize) -> Vec<String> {
    discovered_ids.iter().take(limit).cloned().collect()
}
