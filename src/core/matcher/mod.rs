//! # Matcher Module
//!
//! Fuses the identity signals of two images into a single match decision.
//!
//! ## Decision precedence
//! 1. Equal content digests - byte-exact reuse, always a match
//! 2. Equal image URLs (when enabled) - hotlinked reuse
//! 3. Perceptual fusion - two-of-three hash agreement with a corroborating
//!    check on the remaining family
//!
//! ## Why two-of-three
//! During calibration every single hash family alone produced unacceptable
//! false-positive rates. One signal under threshold is discarded as noise.
//! Two signals are accepted only after a tightened check on the pair (or on
//! the family not already used), which suppressed the known false-positive
//! patterns in the labeled sample. Three signals match unconditionally.
//!
//! The default thresholds are tuned values, not round numbers. They are
//! exposed as configuration because recalibration is expected.

use crate::core::hasher::{Fingerprint, FingerprintKind, FingerprintSet};
use serde::{Deserialize, Serialize};

/// Distance thresholds for the perceptual fusion rule.
///
/// The base thresholds were tuned so that the largest observed distance of a
/// true reuse stays inside while the smallest observed distance of a false
/// positive stays outside. The pair fields tighten specific two-signal
/// combinations that still produced false positives at the base thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchThresholds {
    /// Base pHash distance bound
    pub phash_threshold: u32,
    /// Base aHash distance bound
    pub ahash_threshold: u32,
    /// Base dHash distance bound
    pub dhash_threshold: u32,
    /// {pHash,dHash} pair: tightened pHash bound
    pub pair_phash_dhash_phash_max: u32,
    /// {pHash,dHash} pair: tightened dHash bound
    pub pair_phash_dhash_dhash_max: u32,
    /// {aHash,dHash} pair: corroborating pHash bound (pHash must be present)
    pub pair_ahash_dhash_phash_max: u32,
    /// {pHash,aHash} pair: corroborating dHash bound (dHash must be present)
    pub pair_phash_ahash_dhash_max: u32,
    /// Treat identical image URLs as a match on their own
    pub also_accept_same_image_url: bool,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            phash_threshold: 20,
            ahash_threshold: 15,
            dhash_threshold: 22,
            pair_phash_dhash_phash_max: 15,
            pair_phash_dhash_dhash_max: 18,
            pair_ahash_dhash_phash_max: 20,
            pair_phash_ahash_dhash_max: 15,
            also_accept_same_image_url: true,
        }
    }
}

/// Which signal(s) justified a match; persisted for audit and review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvidence {
    /// Content digests are equal
    Content,
    /// Content digests and image URLs are both equal
    ContentAndUrl,
    /// Image URLs are equal (digest differs)
    Url,
    /// Perceptual fusion matched on these hash families
    Perceptual(Vec<FingerprintKind>),
}

impl std::fmt::Display for MatchEvidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchEvidence::Content => f.write_str("content"),
            MatchEvidence::ContentAndUrl => f.write_str("content+url"),
            MatchEvidence::Url => f.write_str("url"),
            MatchEvidence::Perceptual(kinds) => {
                let joined = kinds
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join("+");
                f.write_str(&joined)
            }
        }
    }
}

fn within(ours: &Option<Fingerprint>, theirs: &Option<Fingerprint>, threshold: u32) -> bool {
    match (ours, theirs) {
        (Some(a), Some(b)) => a.distance(b) <= threshold,
        // An absent fingerprint is never similar to anything
        _ => false,
    }
}

/// Decide whether two images are the same work.
///
/// Pure and deterministic: the same inputs always produce the same decision,
/// and the perceptual path is symmetric in its arguments. Returns the
/// evidence on match, `None` otherwise.
pub fn fuse(
    ours: &FingerprintSet,
    theirs: &FingerprintSet,
    our_url: Option<&str>,
    their_url: Option<&str>,
    cfg: &MatchThresholds,
) -> Option<MatchEvidence> {
    let digest_match = ours.digest == theirs.digest;
    let url_match = cfg.also_accept_same_image_url
        && matches!(
            (our_url, their_url),
            (Some(a), Some(b)) if !a.trim().is_empty() && a.trim() == b.trim()
        );

    if digest_match && url_match {
        return Some(MatchEvidence::ContentAndUrl);
    }
    if digest_match {
        return Some(MatchEvidence::Content);
    }
    if url_match {
        return Some(MatchEvidence::Url);
    }

    perceptual_fuse(ours, theirs, cfg)
}

/// The two-of-three perceptual fusion rule.
fn perceptual_fuse(
    ours: &FingerprintSet,
    theirs: &FingerprintSet,
    cfg: &MatchThresholds,
) -> Option<MatchEvidence> {
    let phash_hit = within(&ours.phash, &theirs.phash, cfg.phash_threshold);
    let ahash_hit = within(&ours.ahash, &theirs.ahash, cfg.ahash_threshold);
    let dhash_hit = within(&ours.dhash, &theirs.dhash, cfg.dhash_threshold);

    let mut hits = Vec::new();
    if phash_hit {
        hits.push(FingerprintKind::Perceptual);
    }
    if ahash_hit {
        hits.push(FingerprintKind::Average);
    }
    if dhash_hit {
        hits.push(FingerprintKind::Gradient);
    }

    match hits.len() {
        3 => Some(MatchEvidence::Perceptual(hits)),
        2 => {
            // Each pair has a known false-positive pattern; require the
            // tightened or corroborating check before accepting.
            if phash_hit && dhash_hit {
                let tight = within(&ours.phash, &theirs.phash, cfg.pair_phash_dhash_phash_max)
                    && within(&ours.dhash, &theirs.dhash, cfg.pair_phash_dhash_dhash_max);
                return tight.then_some(MatchEvidence::Perceptual(hits));
            }
            if ahash_hit && dhash_hit {
                let corroborated =
                    within(&ours.phash, &theirs.phash, cfg.pair_ahash_dhash_phash_max);
                return corroborated.then_some(MatchEvidence::Perceptual(hits));
            }
            // phash + ahash
            let corroborated = within(&ours.dhash, &theirs.dhash, cfg.pair_phash_ahash_dhash_max);
            corroborated.then_some(MatchEvidence::Perceptual(hits))
        }
        // A lone signal under threshold is noise
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::ContentDigest;

    /// 64-bit fingerprint with exactly `bits` bits set, so its distance to
    /// the all-zero fingerprint is `bits`.
    fn fp_with_distance(bits: u32, kind: FingerprintKind) -> Fingerprint {
        let mut bytes = [0u8; 8];
        for i in 0..bits {
            bytes[(i / 8) as usize] |= 1 << (i % 8);
        }
        Fingerprint::new(bytes.to_vec(), kind)
    }

    fn zero_fp(kind: FingerprintKind) -> Fingerprint {
        Fingerprint::new(vec![0u8; 8], kind)
    }

    /// Build a pair of sets whose pairwise distances are exactly
    /// (phash_dist, ahash_dist, dhash_dist). `None` marks an absent hash
    /// on both sides.
    fn set_pair(
        digests: (&[u8], &[u8]),
        phash: Option<u32>,
        ahash: Option<u32>,
        dhash: Option<u32>,
    ) -> (FingerprintSet, FingerprintSet) {
        let ours = FingerprintSet {
            digest: ContentDigest::of(digests.0),
            phash: phash.map(|_| zero_fp(FingerprintKind::Perceptual)),
            ahash: ahash.map(|_| zero_fp(FingerprintKind::Average)),
            dhash: dhash.map(|_| zero_fp(FingerprintKind::Gradient)),
        };
        let theirs = FingerprintSet {
            digest: ContentDigest::of(digests.1),
            phash: phash.map(|d| fp_with_distance(d, FingerprintKind::Perceptual)),
            ahash: ahash.map(|d| fp_with_distance(d, FingerprintKind::Average)),
            dhash: dhash.map(|d| fp_with_distance(d, FingerprintKind::Gradient)),
        };
        (ours, theirs)
    }

    fn cfg() -> MatchThresholds {
        MatchThresholds::default()
    }

    #[test]
    fn equal_digests_match_as_content() {
        let (ours, theirs) = set_pair((b"img", b"img"), Some(60), Some(60), Some(60));
        let result = fuse(&ours, &theirs, None, None, &cfg());
        assert_eq!(result, Some(MatchEvidence::Content));
    }

    #[test]
    fn equal_digest_and_url_reports_both() {
        let (ours, theirs) = set_pair((b"img", b"img"), Some(60), Some(60), Some(60));
        let url = "https://img.example.com/1.jpg";
        let result = fuse(&ours, &theirs, Some(url), Some(url), &cfg());
        assert_eq!(result, Some(MatchEvidence::ContentAndUrl));
    }

    #[test]
    fn same_url_alone_matches_when_enabled() {
        let (ours, theirs) = set_pair((b"a", b"b"), Some(60), Some(60), Some(60));
        let url = "https://img.example.com/1.jpg";
        let result = fuse(&ours, &theirs, Some(url), Some(url), &cfg());
        assert_eq!(result, Some(MatchEvidence::Url));
    }

    #[test]
    fn same_url_ignored_when_disabled() {
        let (ours, theirs) = set_pair((b"a", b"b"), Some(60), Some(60), Some(60));
        let url = "https://img.example.com/1.jpg";
        let mut thresholds = cfg();
        thresholds.also_accept_same_image_url = false;
        let result = fuse(&ours, &theirs, Some(url), Some(url), &thresholds);
        assert_eq!(result, None);
    }

    #[test]
    fn single_signal_is_never_sufficient() {
        // Only aHash (distance 5 <= 15) is under threshold.
        let (ours, theirs) = set_pair((b"a", b"b"), Some(40), Some(5), Some(40));
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);
    }

    #[test]
    fn all_three_signals_match_unconditionally() {
        let (ours, theirs) = set_pair((b"a", b"b"), Some(18), Some(12), Some(20));
        let result = fuse(&ours, &theirs, None, None, &cfg());
        assert_eq!(
            result,
            Some(MatchEvidence::Perceptual(vec![
                FingerprintKind::Perceptual,
                FingerprintKind::Average,
                FingerprintKind::Gradient,
            ]))
        );
    }

    #[test]
    fn zero_signals_is_no_match() {
        let (ours, theirs) = set_pair((b"a", b"b"), Some(40), Some(40), Some(40));
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);
    }

    #[test]
    fn phash_dhash_pair_accepted_only_when_tight() {
        // Both inside base thresholds and inside the tightened bounds.
        let (ours, theirs) = set_pair((b"a", b"b"), Some(14), Some(40), Some(17));
        let result = fuse(&ours, &theirs, None, None, &cfg());
        assert_eq!(
            result,
            Some(MatchEvidence::Perceptual(vec![
                FingerprintKind::Perceptual,
                FingerprintKind::Gradient,
            ]))
        );

        // Inside base thresholds (18 <= 20, 20 <= 22) but outside the
        // tightened pair bounds (18 > 15).
        let (ours, theirs) = set_pair((b"a", b"b"), Some(18), Some(40), Some(20));
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);
    }

    #[test]
    fn ahash_dhash_pair_rejected_without_phash_corroboration() {
        // pHash distance 25 > 20: corroboration fails.
        let (ours, theirs) = set_pair((b"a", b"b"), Some(25), Some(10), Some(20));
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);

        // pHash absent entirely: pair rejected.
        let (ours, theirs) = set_pair((b"a", b"b"), None, Some(10), Some(20));
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);
    }

    #[test]
    fn ahash_dhash_pair_accepted_with_relaxed_corroborator() {
        // With a recalibrated corroborator bound the pair can pass while
        // pHash itself stays over its base threshold.
        let mut thresholds = cfg();
        thresholds.pair_ahash_dhash_phash_max = 25;
        let (ours, theirs) = set_pair((b"a", b"b"), Some(24), Some(10), Some(20));
        assert_eq!(
            fuse(&ours, &theirs, None, None, &thresholds),
            Some(MatchEvidence::Perceptual(vec![
                FingerprintKind::Average,
                FingerprintKind::Gradient,
            ]))
        );
    }

    #[test]
    fn phash_ahash_pair_rejected_without_dhash_corroboration() {
        // dHash distance 40 > 15: corroboration fails.
        let (ours, theirs) = set_pair((b"a", b"b"), Some(10), Some(10), Some(40));
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);

        // dHash absent entirely: pair rejected.
        let (ours, theirs) = set_pair((b"a", b"b"), Some(10), Some(10), None);
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);
    }

    #[test]
    fn perceptual_fusion_is_symmetric() {
        let (ours, theirs) = set_pair((b"a", b"b"), Some(18), Some(12), Some(20));
        let forward = fuse(&ours, &theirs, None, None, &cfg());
        let backward = fuse(&theirs, &ours, None, None, &cfg());
        assert_eq!(forward, backward);
    }

    #[test]
    fn blind_sets_never_match_perceptually() {
        let (ours, theirs) = set_pair((b"a", b"b"), None, None, None);
        assert_eq!(fuse(&ours, &theirs, None, None, &cfg()), None);
    }

    #[test]
    fn evidence_tags_render_joined_names() {
        assert_eq!(MatchEvidence::Content.to_string(), "content");
        assert_eq!(MatchEvidence::ContentAndUrl.to_string(), "content+url");
        assert_eq!(MatchEvidence::Url.to_string(), "url");
        assert_eq!(
            MatchEvidence::Perceptual(vec![
                FingerprintKind::Perceptual,
                FingerprintKind::Gradient
            ])
            .to_string(),
            "phash+dhash"
        );
    }
}
