//! Frequency aggregation over parsed rows.

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::parser::ParsedRow;

/// Denominator used for the percentage column.
///
/// The original tooling divided by the number of distinct groups, which
/// makes a text appearing in every row read as far more than 100 / n_rows
/// percent. That is almost certainly a defect, so `TotalRows` is the
/// default; `DistinctGroups` remains available to reproduce old output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PercentBasis {
    #[default]
    Total,
    Distinct,
}

/// One distinct text value with its occurrence count and share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedItem {
    pub text: String,
    pub count: usize,
    pub percentage: f64,
}

/// Groups rows by exact text equality and emits one item per group,
/// sorted ascending by text. The sum of `count` over all items equals
/// the number of input rows.
pub fn aggregate(rows: &[ParsedRow], basis: PercentBasis) -> Vec<AggregatedItem> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.text.as_str()).or_insert(0) += 1;
    }

    let denominator = match basis {
        PercentBasis::Total => rows.len(),
        PercentBasis::Distinct => counts.len(),
    };

    counts
        .into_iter()
        .map(|(text, count)| AggregatedItem {
            text: text.to_string(),
            count,
            percentage: if denominator == 0 {
                0.0
            } else {
                100.0 * count as f64 / denominator as f64
            },
        })
        .collect()
}
