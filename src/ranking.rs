//! Unique sort keys and top-N selection.
//!
//! Records sharing a natural key get a numeric suffix (`""`, `"2"`, `"3"`, ...)
//! until the key is unique. Keys are then ordered as plain strings, so
//! `"10.000 SBD"` sorts before `"2.000 SBD"`. Published reports depend on this
//! order; do not switch it to a numeric comparison.

use crate::models::Record;
use std::collections::BTreeMap;

/// Map every record to a unique key, in ascending string order.
pub fn ranked_keys<'a, F>(records: &'a [Record], key_fn: F) -> Vec<(String, &'a Record)>
where
    F: Fn(&Record) -> String,
{
    let mut by_key: BTreeMap<String, &'a Record> = BTreeMap::new();
    for record in records {
        let base = key_fn(record);
        let mut key = base.clone();
        let mut suffix = 1u32;
        while by_key.contains_key(&key) {
            suffix += 1;
            key = format!("{base}{suffix}");
        }
        by_key.insert(key, record);
    }
    by_key.into_iter().collect()
}

/// The `n` records with the greatest keys, rank 1 first.
///
/// # Arguments
///
/// * `records` - Records to rank
/// * `key_fn` - Natural sort key; collisions are disambiguated by [`ranked_keys`]
/// * `n` - Number of records wanted
///
/// # Returns
///
/// At most `n` records in descending key order. Fewer records than `n` yields
/// all of them.
pub fn rank_top_n<'a, F>(records: &'a [Record], key_fn: F, n: usize) -> Vec<&'a Record>
where
    F: Fn(&Record) -> String,
{
    let keyed = ranked_keys(records, key_fn);
    let skip = keyed.len().saturating_sub(n);
    keyed
        .into_iter()
        .skip(skip)
        .rev()
        .map(|(_, record)| record)
        .collect()
}

/// Key used for the top-N table: the payout string as reported by the feed.
pub fn payout_key(record: &Record) -> String {
    record.payout_value.clone()
}
