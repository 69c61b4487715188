//! Fixed-width text tables.
//!
//! Two layouts are produced:
//!
//! - **Category tables** (frequency, payout total, payout average): the ranked
//!   list is padded to an even length, reversed so the greatest key gets rank 1,
//!   and split at its midpoint. Row `r` holds entry `r` on the left and entry
//!   `r + half` on the right.
//! - **Record table**: one record per row, plus a reference line per record
//!   mapping `[rank]` to the record's address. This table gets no parity padding.
//!
//! Every row starts with three spaces and uses `|` as the column delimiter:
//!
//! ```text
//!    | 1  |  10  | development  | 3  |  4   | ideas        |
//! ```

use crate::aggregate::AVERAGE_SCALE;
use crate::config::{Settings, Widths};
use crate::models::{RankedEntry, RankedList, Record};
use crate::utils::{center, format_number, pad_right, round_to_precision};
use serde::Serialize;

const ROW_PREFIX: &str = "   |";
const ESCAPED_BAR: &str = "&#124;";

/// How the value column of a category table is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Printed as is.
    Count,
    /// Rounded and prefixed with the currency marker.
    Money,
    /// Divided by [`AVERAGE_SCALE`], then rendered as [`ValueKind::Money`].
    ScaledMoney,
}

/// Rendering parameters shared by every table of a report.
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub widths: Widths,
    pub precision: f64,
    pub currency_marker: String,
    pub link_base: String,
}

impl TableFormat {
    pub fn from_settings(settings: &Settings) -> Self {
        TableFormat {
            widths: settings.widths,
            precision: settings.precision(),
            currency_marker: settings.currency_marker.clone(),
            link_base: settings.link_base.clone(),
        }
    }

    fn money(&self, amount: f64) -> String {
        format!(
            "{}{}",
            self.currency_marker,
            format_number(round_to_precision(amount, self.precision))
        )
    }

    fn index(&self, rank: usize) -> String {
        center(&rank.to_string(), self.widths.idx)
    }

    fn value(&self, entry: &RankedEntry, kind: ValueKind) -> String {
        let text = match (kind, entry.value.parse::<f64>()) {
            _ if entry.is_blank() => String::new(),
            (ValueKind::Money, Ok(v)) => self.money(v),
            (ValueKind::ScaledMoney, Ok(v)) => self.money(v / AVERAGE_SCALE),
            _ => entry.value.clone(),
        };
        center(&text, self.widths.cnt)
    }

    fn name(&self, label: &str) -> String {
        pad_right(&format!(" {label}"), self.widths.name)
    }
}

/// Render a category ranking in the two-pairs-per-row layout.
pub fn format_ranked_table(list: &RankedList, kind: ValueKind, fmt: &TableFormat) -> Vec<String> {
    let padded = list.padded_to_even();
    let half = padded.len() / 2;
    let mut rows: Vec<String> = Vec::with_capacity(half);

    for (i, entry) in padded.entries().iter().rev().enumerate() {
        let cell = format!(
            "{}|{}|{}|",
            fmt.index(i + 1),
            fmt.value(entry, kind),
            fmt.name(&entry.label)
        );
        if i < half {
            rows.push(format!("{ROW_PREFIX}{cell}"));
        } else {
            rows[i - half].push_str(&cell);
        }
    }
    rows
}

/// Rows and reference lines of the top-N record table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordTable {
    #[serde(rename = "type_pay_blog")]
    pub rows: Vec<String>,
    #[serde(rename = "type_url_blog")]
    pub references: Vec<String>,
}

/// Render the top records, rank 1 first.
pub fn format_record_table(records: &[&Record], fmt: &TableFormat) -> RecordTable {
    let w = &fmt.widths;
    let mut table = RecordTable::default();

    for (i, record) in records.iter().enumerate() {
        let idx = fmt.index(i + 1);
        let rank = idx.trim();
        let payout = center(&fmt.money(record.payout), w.cnt);
        let category = pad_right(&record.category, w.category);
        let author = pad_right(&record.author, w.author);
        let title = pad_right(&record.title.replace('|', ESCAPED_BAR), w.title);

        table.rows.push(format!(
            "{ROW_PREFIX}{idx}|{payout}|{category}|{author}|[{title}][{rank}]|"
        ));
        table
            .references
            .push(format!("[{rank}]: {}{}", fmt.link_base, record.url));
    }
    table
}
