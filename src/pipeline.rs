//! One digest run, start to finish.
//!
//! ```text
//! fetch_window -> aggregate + rank_top_n -> tables -> Report -> publish -> audit
//! ```
//!
//! Every stage returns a value or fails; the first fatal error ends the run
//! before anything is published. An empty window takes a separate path that
//! writes a `count = 0` audit record and publishes nothing.

use crate::aggregate::{aggregate, CategoryRankings};
use crate::config::{JobConfig, Settings};
use crate::error::Result;
use crate::feed::{fetch_window, FeedSource};
use crate::models::{Record, Window};
use crate::outputs::audit::{AuditRecord, AuditStore};
use crate::outputs::report::{iso8601, Report, ReportTables};
use crate::outputs::table::{format_ranked_table, format_record_table, TableFormat, ValueKind};
use crate::publish::{report_permlink, Publisher, Submission};
use crate::ranking::{payout_key, rank_top_n};
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No posts in the window; nothing was published.
    Empty { window: Window },
    Published(Report),
}

/// Compute statistics and render every table for a non-empty window.
pub fn build_report(
    settings: &Settings,
    window: Window,
    records: &[Record],
    generated_at: DateTime<Utc>,
) -> Report {
    let stats = aggregate(records);
    info!(categories = stats.len(), "Aggregated window");
    let rankings = CategoryRankings::from_stats(&stats);
    let top = rank_top_n(records, payout_key, settings.count);
    let fmt = TableFormat::from_settings(settings);

    let tables = ReportTables {
        type_freq: format_ranked_table(&rankings.frequency, ValueKind::Count, &fmt),
        type_pay_total: format_ranked_table(&rankings.total, ValueKind::Money, &fmt),
        type_pay_avg: format_ranked_table(&rankings.average, ValueKind::ScaledMoney, &fmt),
        records: format_record_table(&top, &fmt),
    };

    Report {
        title: format!("{}{}", settings.title, generated_at.format("%Y-%m-%d")),
        author: settings.author.name.clone(),
        permlink: report_permlink(&settings.title, &window),
        window,
        generated_at,
        count: records.len(),
        limit: settings.count,
        tables,
    }
}

/// Write the audit record; failures are logged and swallowed.
async fn record_audit<A: AuditStore>(audit: &A, record: &AuditRecord) {
    if let Err(e) = audit.write(record).await {
        error!(error = %e, count = record.count, "Failed to write audit record");
    }
}

/// Run the digest for the window ending `days_before` days before `now`.
#[instrument(level = "info", skip_all, fields(days_before = config.settings.days_before))]
pub async fn run<F, P, A>(
    config: &JobConfig,
    feed: &F,
    publisher: &P,
    audit: &A,
    now: DateTime<Utc>,
) -> Result<RunOutcome>
where
    F: FeedSource,
    P: Publisher,
    A: AuditStore,
{
    let settings = &config.settings;
    let window = Window::days_before(now, settings.days_before)?;
    info!(
        from = %iso8601(&window.start),
        to = %iso8601(&window.end),
        "Retrieving window"
    );

    let records = fetch_window(feed, &window, settings.page_size).await?;
    if records.is_empty() {
        info!("No posts in window; skipping publish");
        record_audit(audit, &AuditRecord::empty(window, now)).await;
        return Ok(RunOutcome::Empty { window });
    }

    let report = build_report(settings, window, &records, now);
    let submission = Submission {
        author: report.author.clone(),
        permlink: report.permlink.clone(),
        parent_author: String::new(),
        parent_permlink: settings.parent_permlink.clone(),
        title: report.title.clone(),
        body: report.render(&config.template),
        json_metadata: settings.json_metadata.clone(),
    };

    publisher.publish(&submission).await?;
    info!(permlink = %report.permlink, count = report.count, "Report published");

    record_audit(audit, &AuditRecord::for_report(&report, &settings.json_metadata)).await;
    Ok(RunOutcome::Published(report))
}
