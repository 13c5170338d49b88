//! # Hasher Module
//!
//! Computes the content-identity digest and perceptual fingerprints for
//! image buffers.
//!
//! ## Signals
//! - **Content digest** - BLAKE3 over the raw bytes, for byte-exact reuse
//! - **pHash (Perceptual)** - DCT-based, robust to recompression
//! - **aHash (Average)** - brightness average, catches exact/near-exact copies
//! - **dHash (Gradient)** - brightness gradients, strong on resized reposts
//!
//! ## How It Works
//! 1. Decode the downloaded bytes
//! 2. Normalize to a fixed 256x256 canvas so differing source resolutions
//!    still compare meaningfully
//! 3. Compute all three perceptual hashes from the same normalized image
//! 4. Compare fingerprints via Hamming distance; fuse in `core::matcher`
//!
//! A buffer that fails to decode yields a [`FingerprintSet`] with all
//! perceptual fields absent - comparison weakens, it never crashes.

mod fingerprint;

pub use fingerprint::{Fingerprint, FingerprintKind};

use image::imageops::FilterType;
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canvas size images are normalized to before perceptual hashing.
/// Resized reposts land on the same canvas and stay comparable.
const NORMALIZE_SIZE: u32 = 256;

/// Bit width of each perceptual hash (8x8 = 64 bits)
const HASH_SIZE: u32 = 8;

/// Hex-encoded cryptographic digest of raw image bytes.
///
/// Deterministic and collision-resistant: equal digests mean byte-identical
/// images with overwhelming probability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest a raw byte buffer. Never fails.
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// All identity signals computed for one image buffer.
///
/// The digest is always present (it is a function of the raw bytes); any
/// perceptual field may be absent when the image failed to decode.
#[derive(Debug, Clone)]
pub struct FingerprintSet {
    pub digest: ContentDigest,
    pub phash: Option<Fingerprint>,
    pub ahash: Option<Fingerprint>,
    pub dhash: Option<Fingerprint>,
}

impl FingerprintSet {
    /// True when no perceptual signal could be computed
    pub fn is_blind(&self) -> bool {
        self.phash.is_none() && self.ahash.is_none() && self.dhash.is_none()
    }
}

/// Computes fingerprint sets for image buffers.
///
/// Holds one configured hasher per hash family so every image is hashed
/// consistently across the run.
pub struct FingerprintEngine {
    phash: Hasher,
    ahash: Hasher,
    dhash: Hasher,
}

impl FingerprintEngine {
    pub fn new() -> Self {
        Self {
            phash: HasherConfig::new()
                .hash_size(HASH_SIZE, HASH_SIZE)
                .hash_alg(HashAlg::Mean)
                .preproc_dct()
                .to_hasher(),
            ahash: HasherConfig::new()
                .hash_size(HASH_SIZE, HASH_SIZE)
                .hash_alg(HashAlg::Mean)
                .to_hasher(),
            dhash: HasherConfig::new()
                .hash_size(HASH_SIZE, HASH_SIZE)
                .hash_alg(HashAlg::Gradient)
                .to_hasher(),
        }
    }

    /// Compute the content digest and all perceptual fingerprints for a
    /// downloaded image buffer.
    ///
    /// Decode failures are not errors: the returned set simply carries no
    /// perceptual fingerprints and comparison falls back to the digest.
    pub fn fingerprint(&self, bytes: &[u8]) -> FingerprintSet {
        let digest = ContentDigest::of(bytes);

        let normalized = match self.load_normalized(bytes) {
            Some(img) => img,
            None => {
                debug!(len = bytes.len(), "image failed to decode, digest-only fingerprint");
                return FingerprintSet {
                    digest,
                    phash: None,
                    ahash: None,
                    dhash: None,
                };
            }
        };

        FingerprintSet {
            digest,
            phash: Some(Fingerprint::new(
                self.phash.hash_image(&normalized).as_bytes().to_vec(),
                FingerprintKind::Perceptual,
            )),
            ahash: Some(Fingerprint::new(
                self.ahash.hash_image(&normalized).as_bytes().to_vec(),
                FingerprintKind::Average,
            )),
            dhash: Some(Fingerprint::new(
                self.dhash.hash_image(&normalized).as_bytes().to_vec(),
                FingerprintKind::Gradient,
            )),
        }
    }

    fn load_normalized(&self, bytes: &[u8]) -> Option<DynamicImage> {
        let img = image::load_from_memory(bytes).ok()?;
        Some(img.resize_exact(NORMALIZE_SIZE, NORMALIZE_SIZE, FilterType::Lanczos3))
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new()
    }
}
