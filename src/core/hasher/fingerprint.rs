//! Fixed-width bit-vector fingerprint with an explicit distance operation.

use serde::{Deserialize, Serialize};

/// The perceptual hash families used for fingerprinting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerprintKind {
    /// Perceptual Hash (pHash) - DCT-based, robust to edits and recompression
    Perceptual,
    /// Average Hash (aHash) - brightness-average comparison
    Average,
    /// Gradient Hash (dHash) - brightness-gradient comparison, strong on resizes
    Gradient,
}

impl FingerprintKind {
    /// Short name used in evidence tags and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerprintKind::Perceptual => "phash",
            FingerprintKind::Average => "ahash",
            FingerprintKind::Gradient => "dhash",
        }
    }
}

impl std::fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed perceptual fingerprint.
///
/// A fingerprint that could not be computed (corrupt or undecodable image)
/// is represented as `Option::None` by callers, never as an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    bytes: Vec<u8>,
    kind: FingerprintKind,
}

impl Fingerprint {
    /// Create a fingerprint from raw hash bytes
    pub fn new(bytes: Vec<u8>, kind: FingerprintKind) -> Self {
        Self { bytes, kind }
    }

    /// The hash family that produced this fingerprint
    pub fn kind(&self) -> FingerprintKind {
        self.kind
    }

    /// The raw hash bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hamming distance: the number of bits that disagree.
    ///
    /// Only meaningful between fingerprints of the same kind and width;
    /// trailing bytes present on one side only count as fully different.
    pub fn distance(&self, other: &Self) -> u32 {
        debug_assert_eq!(self.kind, other.kind);
        let shared: u32 = self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let longer = self.bytes.len().max(other.bytes.len());
        let shorter = self.bytes.len().min(other.bytes.len());
        shared + ((longer - shorter) * 8) as u32
    }

    /// Hex rendering, for logs and stored evidence
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(bytes: &[u8]) -> Fingerprint {
        Fingerprint::new(bytes.to_vec(), FingerprintKind::Gradient)
    }

    #[test]
    fn distance_to_self_is_zero() {
        let hash = fp(&[0xFF, 0x00, 0xAA, 0x55]);
        assert_eq!(hash.distance(&hash), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = fp(&[0xFF, 0x00]);
        let b = fp(&[0x00, 0xFF]);
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn distance_counts_differing_bits() {
        let a = fp(&[0b11111111]);
        let b = fp(&[0b00000000]);
        assert_eq!(a.distance(&b), 8);
    }

    #[test]
    fn width_mismatch_counts_as_difference() {
        let a = fp(&[0xFF, 0xFF]);
        let b = fp(&[0xFF]);
        assert_eq!(a.distance(&b), 8);
    }

    #[test]
    fn to_hex_produces_correct_string() {
        let hash = fp(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(hash.to_hex(), "deadbeef");
    }

    #[test]
    fn kind_names_match_evidence_tags() {
        assert_eq!(FingerprintKind::Perceptual.to_string(), "phash");
        assert_eq!(FingerprintKind::Average.to_string(), "ahash");
        assert_eq!(FingerprintKind::Gradient.to_string(), "dhash");
    }
}
