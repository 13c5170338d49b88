//! # CLI Module
//!
//! Command-line interface over the persisted scan state. Running scans
//! needs a marketplace client and a credential, which integrators supply
//! through the library API; the CLI covers everything that only needs the
//! state database.
//!
//! ## Usage
//! ```bash
//! # Recent runs
//! listing-sentinel runs
//!
//! # Detections awaiting action
//! listing-sentinel detections --status new
//!
//! # Export one run's detections for review
//! listing-sentinel report <run-id> --output findings.csv
//!
//! # Record that a notice went out
//! listing-sentinel mark-sent <detection-id>
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use listing_sentinel::config::ScanConfig;
use listing_sentinel::core::report::write_run_report_file;
use listing_sentinel::core::store::{DetectionRow, DetectionStatus, Store};
use listing_sentinel::error::Result;
use std::path::PathBuf;

/// Listing Sentinel - find unauthorized reuse of your product photos
#[derive(Parser, Debug)]
#[command(name = "listing-sentinel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, default_value = "sentinel.toml")]
    config: PathBuf,

    /// State database path (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List recent scan runs
    Runs {
        /// How many runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List stored detections
    Detections {
        /// Filter by status
        #[arg(short, long, default_value = "new")]
        status: StatusArg,

        /// How many detections to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Export one run's detections as CSV
    Report {
        /// The run to export
        run_id: String,

        /// Destination file
        #[arg(short, long, default_value = "detections.csv")]
        output: PathBuf,
    },

    /// Mark a detection's notice as sent
    MarkSent {
        /// The detection to update
        detection_id: i64,
    },

    /// Delete a run and everything recorded under it
    PruneRun {
        /// The run to delete
        run_id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    /// Awaiting action
    New,
    /// Notice already sent
    Sent,
}

impl From<StatusArg> for DetectionStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::New => DetectionStatus::New,
            StatusArg::Sent => DetectionStatus::Sent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = ScanConfig::load_or_default(&cli.config)?;
    let db_path = cli.db.unwrap_or_else(|| config.db_path());
    let store = Store::open(&db_path)?;

    match cli.command {
        Commands::Runs { limit } => show_runs(&store, limit),
        Commands::Detections {
            status,
            limit,
            output,
        } => show_detections(&store, status.into(), limit, output),
        Commands::Report { run_id, output } => export_report(&store, &run_id, &output),
        Commands::MarkSent { detection_id } => mark_sent(&store, detection_id),
        Commands::PruneRun { run_id } => prune_run(&store, &run_id),
    }
}

fn show_runs(store: &Store, limit: usize) -> Result<()> {
    let term = Term::stdout();
    let runs = store.list_runs(limit)?;

    if runs.is_empty() {
        term.write_line("No runs recorded yet.").ok();
        return Ok(());
    }

    if let Some(finished) = store.last_run_finished_at()? {
        term.write_line(&format!(
            "Last completed run: {}",
            style(finished.format("%Y-%m-%d %H:%M UTC")).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    for run in runs {
        let state = match run.finished_at {
            Some(_) => style("finished").green(),
            None => style("open").yellow(),
        };
        term.write_line(&format!(
            "{} {} [{}]",
            style(&run.run_id).bold(),
            run.started_at.format("%Y-%m-%d %H:%M UTC"),
            state,
        ))
        .ok();
        term.write_line(&format!(
            "  {} listings, {} images, {} candidates, {} new detections, {} errors",
            run.scanned_listings,
            run.scanned_images,
            run.candidates_checked,
            style(run.detections_new).cyan(),
            if run.errors > 0 {
                style(run.errors).red()
            } else {
                style(run.errors).dim()
            },
        ))
        .ok();
        if let Some(notes) = &run.notes {
            term.write_line(&format!("  {}", style(notes).dim())).ok();
        }
    }
    Ok(())
}

fn show_detections(
    store: &Store,
    status: DetectionStatus,
    limit: usize,
    output: OutputFormat,
) -> Result<()> {
    let detections = store.detections_with_status(status, limit)?;

    match output {
        OutputFormat::Json => print_json_detections(&detections),
        OutputFormat::Pretty => print_pretty_detections(&detections, status),
    }
    Ok(())
}

fn print_pretty_detections(detections: &[DetectionRow], status: DetectionStatus) {
    let term = Term::stdout();

    if detections.is_empty() {
        term.write_line(&format!("No {} detections.", status.as_str()))
            .ok();
        return;
    }

    for d in detections {
        term.write_line(&format!(
            "{} {} {} copied by {}",
            style(format!("#{}", d.detection_id)).bold(),
            style(&d.match_evidence).yellow(),
            d.your_item_id,
            style(&d.infringing_seller_display).red(),
        ))
        .ok();
        term.write_line(&format!("  yours:  {}", d.your_item_url)).ok();
        term.write_line(&format!("  theirs: {}", d.infringing_item_url))
            .ok();
        term.write_line(&format!(
            "  {}",
            style(d.detected_at.format("%Y-%m-%d %H:%M UTC")).dim()
        ))
        .ok();
        term.write_line("").ok();
    }
}

fn print_json_detections(detections: &[DetectionRow]) {
    let output = serde_json::json!({
        "count": detections.len(),
        "detections": detections,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to encode detections: {e}"),
    }
}

fn export_report(store: &Store, run_id: &str, output: &std::path::Path) -> Result<()> {
    let term = Term::stdout();
    let count = write_run_report_file(store, run_id, output)?;
    term.write_line(&format!(
        "{} Wrote {} detection(s) to {}",
        style("✓").green().bold(),
        count,
        output.display(),
    ))
    .ok();
    Ok(())
}

fn mark_sent(store: &Store, detection_id: i64) -> Result<()> {
    let term = Term::stdout();
    if store.update_detection_status(detection_id, DetectionStatus::Sent)? {
        term.write_line(&format!(
            "{} Detection #{detection_id} marked as sent",
            style("✓").green().bold(),
        ))
        .ok();
    } else {
        term.write_line(&format!(
            "{} No detection #{detection_id}",
            style("✗").red().bold(),
        ))
        .ok();
    }
    Ok(())
}

fn prune_run(store: &Store, run_id: &str) -> Result<()> {
    let term = Term::stdout();
    if store.delete_run(run_id)? {
        term.write_line(&format!(
            "{} Deleted run {run_id} and its detections",
            style("✓").green().bold(),
        ))
        .ok();
    } else {
        term.write_line(&format!("{} No run {run_id}", style("✗").red().bold()))
            .ok();
    }
    Ok(())
}
