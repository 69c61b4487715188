//! Report assembly: computed values and rendered tables substituted into the
//! body template.
//!
//! # Placeholders
//!
//! | Marker | Value |
//! |--------|-------|
//! | `$YESTERDAY` | window start, ISO-8601 |
//! | `$TODAY` | window end, ISO-8601 |
//! | `$NOW` | generation time, ISO-8601 |
//! | `$COUNT` | number of records in the window |
//! | `$LIMIT` | requested top-N size |
//! | `$type_freq` | frequency table |
//! | `$type_pay_total` | payout total table |
//! | `$type_pay_avg` | payout average table |
//! | `$type_pay_blog` | top-N record rows |
//! | `$type_url_blog` | reference lines for the record rows |
//!
//! Substitution is a single left-to-right pass: text inserted for one marker is
//! never scanned for others, and only the first occurrence of each marker is
//! replaced.

use crate::models::Window;
use crate::outputs::table::RecordTable;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

pub const MARKERS: [&str; 10] = [
    "$YESTERDAY",
    "$TODAY",
    "$NOW",
    "$COUNT",
    "$LIMIT",
    "$type_freq",
    "$type_pay_total",
    "$type_pay_avg",
    "$type_pay_blog",
    "$type_url_blog",
];

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    let mut markers = MARKERS.to_vec();
    markers.sort_by_key(|m| std::cmp::Reverse(m.len()));
    let alternation = markers
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).expect("marker pattern is valid")
});

/// ISO-8601 with milliseconds and a `Z` suffix, e.g. `2018-03-04T00:00:00.000Z`.
pub fn iso8601(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Replace each marker in `template` with its value from `substitutions`.
///
/// Markers without a value, and repeated occurrences of a marker, are left as is.
///
/// # Arguments
///
/// * `template` - Body text containing `$MARKER` placeholders
/// * `substitutions` - Marker to replacement text
///
/// # Returns
///
/// The assembled body. Replacement text is inserted verbatim and never
/// scanned for further markers.
pub fn assemble(template: &str, substitutions: &HashMap<&str, String>) -> String {
    let mut used: Vec<&'static str> = Vec::new();
    let body = MARKER_RE.replace_all(template, |caps: &Captures| {
        let matched = &caps[0];
        let Some(marker) = MARKERS.iter().copied().find(|m| *m == matched) else {
            return matched.to_string();
        };
        match substitutions.get(marker) {
            Some(value) if !used.contains(&marker) => {
                used.push(marker);
                value.clone()
            }
            Some(_) => {
                warn!(marker, "Marker appears more than once; later occurrence left in place");
                matched.to_string()
            }
            None => matched.to_string(),
        }
    });
    body.into_owned()
}

/// The five rendered table blocks of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTables {
    pub type_freq: Vec<String>,
    pub type_pay_total: Vec<String>,
    pub type_pay_avg: Vec<String>,
    #[serde(flatten)]
    pub records: RecordTable,
}

/// Everything a published report is made of.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub author: String,
    pub permlink: String,
    pub window: Window,
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub limit: usize,
    pub tables: ReportTables,
}

impl Report {
    pub fn substitutions(&self) -> HashMap<&'static str, String> {
        let t = &self.tables;
        HashMap::from([
            ("$YESTERDAY", iso8601(&self.window.start)),
            ("$TODAY", iso8601(&self.window.end)),
            ("$NOW", iso8601(&self.generated_at)),
            ("$COUNT", self.count.to_string()),
            ("$LIMIT", self.limit.to_string()),
            ("$type_freq", t.type_freq.join("\n")),
            ("$type_pay_total", t.type_pay_total.join("\n")),
            ("$type_pay_avg", t.type_pay_avg.join("\n")),
            ("$type_pay_blog", t.records.rows.join("\n")),
            ("$type_url_blog", t.records.references.join("\n")),
        ])
    }

    /// The report body: `template` with every placeholder filled in.
    pub fn render(&self, template: &str) -> String {
        assemble(template, &self.substitutions())
    }
}
