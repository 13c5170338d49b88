//! # Listing Sentinel
//!
//! Scans your marketplace listings for other sellers reusing your product
//! photos, and explains why each flagged pair matches.
//!
//! ## Core Philosophy
//! - **Never auto-act** - Detections are recorded and reviewed; nothing is
//!   sent or reported without an explicit operator step
//! - **Show WHY** - Every detection carries the evidence that justified it
//! - **Fail small** - A broken image or a flaky search costs one image,
//!   never the run
//!
//! ## Architecture
//! The library is split into a core engine (front-end-agnostic) and
//! presentation layers:
//! - `core` - The scan engine
//! - `config` - TOML configuration
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface over the persisted state
//!
//! The marketplace client and the credential flow live outside this crate;
//! callers hand in a [`core::Marketplace`] implementation and an
//! [`core::AccessToken`] and drive scans through [`core::run_once`].

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SentinelError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
