//! # Events Module
//!
//! Progress reporting for scan runs.
//!
//! ## Design
//! The run loop emits events through a channel; any front end (CLI,
//! service wrapper, test harness) can subscribe. Runs work fine with
//! nobody listening.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Listing(ListingEvent::DetectionRecorded { infringing_item_id, .. }) = event {
//!             println!("detection: {infringing_item_id}");
//!         }
//!     }
//! });
//!
//! run_once(&deps, &params, sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
