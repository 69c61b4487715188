//! # Category Digest
//!
//! A scheduled report job: it pages a time-descending post feed until it has
//! every post of one UTC day, ranks and aggregates the posts by category,
//! renders fixed-width text tables into a body template, publishes the report
//! and appends an audit record.
//!
//! ## Usage
//!
//! ```sh
//! category_digest -c ./settings.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Paging**: fetch pages until one reaches past the window start
//! 2. **Ranking**: unique text sort keys, top-N records by payout
//! 3. **Aggregation**: count, total and average payout per category
//! 4. **Formatting**: paired category tables and the record table
//! 5. **Output**: publish the assembled report, then write the audit record

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod aggregate;
mod cli;
mod config;
mod error;
mod feed;
mod models;
mod outputs;
mod pipeline;
mod publish;
mod ranking;
mod utils;

use cli::Cli;
use feed::HttpFeed;
use outputs::audit::FileAuditStore;
use pipeline::RunOutcome;
use publish::{DirectoryPublisher, HttpPublisher, ReportPublisher};

/// Directory reports go to when neither a publish endpoint nor `--dry-run-dir` is set.
const DEFAULT_DRY_RUN_DIR: &str = "reports";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("category_digest starting up");

    let args = Cli::parse();
    debug!(config = %args.config.display(), ?args.days_before, ?args.count, "Parsed CLI arguments");

    let job = config::load(&args.config, &args).await?;
    let settings = &job.settings;
    let timeout = Duration::from_secs(settings.request_timeout_secs);

    let feed = HttpFeed::new(&settings.feed_url, timeout)?;
    let publisher = match (&args.dry_run_dir, &settings.publish.endpoint) {
        (Some(dir), _) => ReportPublisher::Directory(DirectoryPublisher { dir: dir.clone() }),
        (None, Some(endpoint)) => {
            ReportPublisher::Http(HttpPublisher::new(endpoint, &settings.author.posting, timeout)?)
        }
        (None, None) => ReportPublisher::Directory(DirectoryPublisher {
            dir: PathBuf::from(DEFAULT_DRY_RUN_DIR),
        }),
    };
    let audit = FileAuditStore::new(&settings.audit.target, &settings.audit.collection);

    match pipeline::run(&job, &feed, &publisher, &audit, Utc::now()).await? {
        RunOutcome::Empty { window } => {
            info!(from = %window.start, to = %window.end, "No activity in window; nothing published");
        }
        RunOutcome::Published(report) => {
            info!(
                title = %report.title,
                permlink = %report.permlink,
                count = report.count,
                "Report published"
            );
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
