//! Command-line interface definitions for the digest job.
//!
//! Options given here override the matching keys of the settings file.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one digest run.
///
/// # Examples
///
/// ```sh
/// # Report on yesterday (UTC)
/// category_digest -c ./settings.yaml
///
/// # Re-run the report for three days ago, top 20, without publishing
/// category_digest -c ./settings.yaml --days-before 2 --count 20 --dry-run-dir ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML settings file
    #[arg(short, long, env = "DIGEST_CONFIG")]
    pub config: PathBuf,

    /// Window offset in days (overrides `days_before`)
    #[arg(long)]
    pub days_before: Option<u32>,

    /// Number of top records to list (overrides `count`)
    #[arg(long)]
    pub count: Option<usize>,

    /// Write the report into this directory instead of calling the publish endpoint
    #[arg(long)]
    pub dry_run_dir: Option<PathBuf>,
}
