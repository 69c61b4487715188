//! Per-category statistics and the three category rankings.

use crate::models::{CategoryStats, RankedList, Record, StatsMap};
use crate::utils::format_number;
use serde::Serialize;
use tracing::debug;

/// Factor applied to averages before they enter a composite key.
pub const AVERAGE_SCALE: f64 = 10000.0;

/// Group `records` by category, counting them and summing their payouts.
pub fn aggregate(records: &[Record]) -> StatsMap {
    let mut stats = StatsMap::new();
    for record in records {
        let entry = stats.entry(record.category.clone()).or_default();
        entry.count += 1;
        entry.total += record.payout;
    }
    for entry in stats.values_mut() {
        entry.average = entry.total / f64::from(entry.count);
    }
    debug!(categories = stats.len(), records = records.len(), "Aggregated categories");
    stats
}

/// Categories ranked three ways.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRankings {
    pub frequency: RankedList,
    pub total: RankedList,
    /// Values are averages multiplied by [`AVERAGE_SCALE`].
    pub average: RankedList,
}

impl CategoryRankings {
    pub fn from_stats(stats: &StatsMap) -> Self {
        let keys = |metric: fn(&CategoryStats) -> String| {
            stats
                .iter()
                .map(|(category, s)| format!("{}/{}", metric(s), category))
                .collect::<Vec<_>>()
        };
        CategoryRankings {
            frequency: RankedList::from_composite_keys(keys(|s| s.count.to_string())),
            total: RankedList::from_composite_keys(keys(|s| format_number(s.total))),
            average: RankedList::from_composite_keys(keys(|s| {
                format_number(AVERAGE_SCALE * s.total / f64::from(s.count))
            })),
        }
    }
}
