//! # Market Module
//!
//! Data model for marketplace listings and the collaborator contracts the
//! pipeline consumes. Authentication, pagination and transport retries all
//! live on the other side of these traits.

use crate::error::MarketError;
use serde::{Deserialize, Serialize};

/// A ready-to-use marketplace credential.
///
/// Obtained by the caller's auth layer and passed explicitly; the pipeline
/// never reads ambient credential state.
#[derive(Debug, Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The seller identity attached to a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seller {
    /// Display username; may be withheld by the marketplace
    pub username: Option<String>,
    /// Immutable numeric/opaque id; stable even if the username changes
    pub user_id: Option<String>,
}

impl Seller {
    /// Name persisted with detections: username when present, else the id
    pub fn display_name(&self) -> String {
        if let Some(name) = self.username.as_deref().filter(|s| !s.is_empty()) {
            return name.to_string();
        }
        self.user_id.clone().unwrap_or_default()
    }

    /// Whether this seller matches an expected identity (username or
    /// immutable id), case-insensitive and whitespace-tolerant.
    pub fn matches_identity(&self, expected: &str) -> bool {
        let expected = expected.trim();
        if expected.is_empty() {
            return false;
        }
        let expected = expected.to_lowercase();
        if let Some(username) = &self.username {
            if username.trim().to_lowercase() == expected {
                return true;
            }
        }
        if let Some(user_id) = &self.user_id {
            if user_id.trim().to_lowercase() == expected {
                return true;
            }
        }
        false
    }

    /// Whether this seller matches any of the given identities
    pub fn matches_any(&self, identities: &[String]) -> bool {
        identities.iter().any(|id| self.matches_identity(id))
    }
}

/// One marketplace listing as discovered this run.
///
/// Constructed fresh from the marketplace each run and never mutated.
/// Image order is load-bearing: index 0 is the primary image and stored
/// detections reference images by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    pub item_id: String,
    pub web_url: String,
    /// Primary image URL
    pub image_url: Option<String>,
    /// Additional images in gallery order
    pub additional_image_urls: Vec<String>,
    pub seller: Option<Seller>,
    pub title: Option<String>,
}

impl Listing {
    /// Primary image followed by additional images, capped at `max_count`,
    /// order preserved.
    pub fn image_urls(&self, max_count: usize) -> Vec<String> {
        let mut urls = Vec::new();
        if let Some(primary) = self.image_url.as_deref().filter(|u| !u.is_empty()) {
            urls.push(primary.to_string());
        }
        for extra in &self.additional_image_urls {
            if urls.len() >= max_count {
                break;
            }
            if !extra.is_empty() {
                urls.push(extra.clone());
            }
        }
        urls.truncate(max_count);
        urls
    }

    /// Whether this listing belongs to any of the given seller identities
    pub fn is_from_any_seller(&self, identities: &[String]) -> bool {
        match &self.seller {
            Some(seller) => seller.matches_any(identities),
            None => false,
        }
    }
}

/// Contract the marketplace collaborator implements.
///
/// Implementations own their transport concerns (timeouts, retries,
/// pagination); the pipeline sees only complete result sets. All methods
/// take the credential explicitly.
pub trait Marketplace: Send + Sync {
    /// Visual similarity search over the marketplace's index.
    /// Results are in relevance order; that order feeds candidate dedup.
    fn search_by_image(
        &self,
        token: &AccessToken,
        image: &[u8],
        limit: usize,
    ) -> Result<Vec<Listing>, MarketError>;

    /// Keyword search, used to surface textually-identical reposts that
    /// visual search misses.
    fn search_by_keywords(
        &self,
        token: &AccessToken,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Listing>, MarketError>;

    /// Fetch one listing in full. `Ok(None)` when the listing does not
    /// exist or is no longer visible.
    fn fetch_listing(
        &self,
        token: &AccessToken,
        item_id: &str,
    ) -> Result<Option<Listing>, MarketError>;

    /// Enumerate the seller's own active listings in discovery order.
    /// `batch_hint` bounds how many the collaborator should page through.
    fn list_my_listings(
        &self,
        token: &AccessToken,
        batch_hint: usize,
    ) -> Result<Vec<Listing>, MarketError>;
}
