//! # listing-sentinel CLI
//!
//! Command-line interface over the scanner's persisted state.
//!
//! ## Usage
//! ```bash
//! listing-sentinel runs
//! listing-sentinel detections --status new --output json
//! listing-sentinel report <run-id> --output findings.csv
//! ```

mod cli;

use listing_sentinel::Result;

fn main() -> Result<()> {
    listing_sentinel::init_tracing();
    cli::run()
}
