//! Data models for feed posts and the values computed from them.
//!
//! - [`Post`]: a post exactly as the feed serves it
//! - [`Record`]: an immutable, validated post used by every later stage
//! - [`Window`]: the half-open UTC day a run aggregates over
//! - [`CategoryStats`] / [`StatsMap`]: per-category frequency and payouts
//! - [`RankedList`]: an ordered `(value, label)` sequence driving one table

use crate::error::{DigestError, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Category used when a post carries no `json_metadata.type`.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// One post as returned by the feed.
///
/// `created` is a naive timestamp on the wire and is read as UTC.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permlink: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "deserialize_created")]
    pub created: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub json_metadata: PostMetadata,
    pub total_payout_value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostMetadata {
    #[serde(rename = "type", default)]
    pub category: Option<String>,
}

/// The feed wraps pages in `{ "results": [...] }`; a bare array is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FeedPage {
    Envelope { results: Vec<Post> },
    Bare(Vec<Post>),
}

impl FeedPage {
    pub fn into_posts(self) -> Vec<Post> {
        match self {
            FeedPage::Envelope { results } => results,
            FeedPage::Bare(posts) => posts,
        }
    }
}

/// Sparse posts carry explicit `null`s; read them like missing keys.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_created<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_created(&raw).map_err(serde::de::Error::custom)
}

/// Parse a feed timestamp such as `2018-03-01T12:34:56` (a trailing `Z` is tolerated).
pub fn parse_created(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Parse the amount out of a currency-tagged payout such as `"1.250 SBD"`.
pub fn parse_payout(value: &str) -> Result<f64> {
    value
        .split_whitespace()
        .next()
        .and_then(|amount| amount.parse::<f64>().ok())
        .ok_or_else(|| DigestError::Upstream(format!("unparseable payout value {value:?}")))
}

/// A validated post. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub author: String,
    pub permlink: String,
    pub url: String,
    pub title: String,
    pub category: String,
    pub created: DateTime<Utc>,
    /// The payout exactly as the feed reported it, currency code included.
    pub payout_value: String,
    pub payout: f64,
}

impl TryFrom<Post> for Record {
    type Error = DigestError;

    fn try_from(post: Post) -> Result<Self> {
        let payout = parse_payout(&post.total_payout_value)?;
        let category = post
            .json_metadata
            .category
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        Ok(Record {
            author: post.author,
            permlink: post.permlink,
            url: post.url,
            title: post.title,
            category,
            created: post.created,
            payout_value: post.total_payout_value,
            payout,
        })
    }
}

/// Half-open interval `[start, end)` of exactly one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The UTC day that ended at the most recent midnight `days_before` days ago.
    ///
    /// With `days_before = 0` this is "yesterday" relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Config`] when the offset reaches outside the
    /// representable date range.
    pub fn days_before(now: DateTime<Utc>, days_before: u32) -> Result<Self> {
        let out_of_range =
            || DigestError::Config(format!("days_before {days_before} is out of the supported date range"));
        let anchor = now
            .checked_sub_signed(Duration::days(i64::from(days_before)))
            .ok_or_else(out_of_range)?;
        let end = anchor
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight))
            .unwrap_or(anchor);
        let start = end
            .checked_sub_signed(Duration::days(1))
            .ok_or_else(out_of_range)?;
        Ok(Window { start, end })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Frequency and payout totals for one category.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CategoryStats {
    pub count: u32,
    pub total: f64,
    pub average: f64,
}

/// Category label -> stats. Rebuilt every run.
pub type StatsMap = BTreeMap<String, CategoryStats>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub value: String,
    pub label: String,
}

impl RankedEntry {
    pub fn blank() -> Self {
        RankedEntry {
            value: String::new(),
            label: String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.label.is_empty()
    }
}

/// Entries sorted ascending by their composite `"<value>/<label>"` key, compared as text.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RankedList(Vec<RankedEntry>);

impl RankedList {
    /// Sort composite keys as plain strings and split each at its first `/`.
    ///
    /// String order is deliberate: `"10/a"` sorts before `"2/b"`.
    pub fn from_composite_keys(mut keys: Vec<String>) -> Self {
        keys.sort();
        let entries = keys
            .into_iter()
            .map(|key| match key.split_once('/') {
                Some((value, label)) => RankedEntry {
                    value: value.to_string(),
                    label: label.to_string(),
                },
                None => RankedEntry {
                    value: key,
                    label: String::new(),
                },
            })
            .collect();
        RankedList(entries)
    }

    /// Copy of this list with a blank entry prepended when the length is odd.
    pub fn padded_to_even(&self) -> Self {
        let mut entries = self.0.clone();
        if entries.len() % 2 == 1 {
            entries.insert(0, RankedEntry::blank());
        }
        RankedList(entries)
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
