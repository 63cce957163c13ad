//! # PR Tenders
//!
//! A batch scanner that collects Israeli public tenders for spokesperson,
//! public-relations, communications and advertising services, and publishes
//! them as a single JSON snapshot for a static website.
//!
//! ## Features
//!
//! - Scrapes the national procurement portal (mr.gov.il), the gov.il
//!   tenders API, municipal websites and government-owned companies
//! - Keeps only relevant listings using a configurable Hebrew keyword
//!   classifier with exclusion phrases
//! - Normalizes deadlines and tender numbers across sources
//! - Writes `tenders.json` with per-source counts and a status note
//!
//! ## Usage
//!
//! ```sh
//! pr_tenders -o ./data
//! pr_tenders --historical --only portal
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Configuration**: Load keyword lists, label patterns and registries
//! 2. **Scraping**: Run each source adapter in turn (sequential, one session per adapter)
//! 3. **Aggregation**: Merge, deduplicate by tender number and sort by deadline
//! 4. **Output**: Write the JSON snapshot

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod classify;
mod cli;
mod config;
mod dates;
mod error;
mod extract;
mod http;
mod markup;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::PipelineConfig;
use outputs::json;
use utils::ensure_writable_dir;

/// Log filter used when `RUST_LOG` is unset: our own spans at info,
/// dependencies only when they warn.
const DEFAULT_LOG_FILTER: &str = "warn,pr_tenders=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339())
        .init();
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let start_time = std::time::Instant::now();
    info!("pr_tenders starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Fail before scraping if the snapshot cannot be written
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Cannot write the snapshot here; pass another --output-dir"
        );
        return Err(e.into());
    }

    let config = PipelineConfig::load(args.config.as_deref()).await?;

    let snapshot = pipeline::run_pipeline(&config, args.historical, &args.only).await?;
    let record_count = snapshot.total_count;

    if let Err(e) = json::write_snapshot(&snapshot, &args.output_dir).await {
        error!(error = %e, "Failed to write tender snapshot");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        record_count,
        sources = ?snapshot.sources,
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
