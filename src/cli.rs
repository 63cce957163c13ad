//! Command-line interface definitions for the tender scanner.
//!
//! Options can be given as flags or, where noted, environment variables.

use crate::models::Source;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Regular scan into ./data/tenders.json
/// pr_tenders
///
/// # Deep historical scan of the national portal only
/// pr_tenders --historical --only portal -o /srv/site/data
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory that receives tenders.json
    #[arg(short, long, env = "TENDERS_OUTPUT_DIR", default_value = "data")]
    pub output_dir: String,

    /// Optional YAML file replacing the built-in configuration
    #[arg(short, long, env = "TENDERS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Scan deeper into the portal's history and list latest deadlines first
    #[arg(long)]
    pub historical: bool,

    /// Run only the given sources (repeatable); all sources when omitted
    #[arg(long, value_enum)]
    pub only: Vec<Source>,
}
