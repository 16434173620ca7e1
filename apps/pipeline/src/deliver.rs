//! Delivery stage — writes the table to a CSV file and fans rows out to
//! the sticky-note client, one call per note.

use std::path::Path;

use clap::ValueEnum;
use tracing::info;

use crate::aggregate::{aggregate, AggregatedItem, PercentBasis};
use crate::errors::PipelineError;
use crate::miro::MiroClient;
use crate::parser::ParsedRow;

/// How parsed rows become sticky notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DeliveryMode {
    /// One note per row, in table order.
    Verbatim,
    /// One note per distinct text value, with its frequency share.
    #[default]
    Aggregated,
}

/// Sticky-note text for one raw row.
pub fn format_verbatim(ordinal: usize, row: &ParsedRow) -> String {
    format!("{ordinal:03}. {}", row.text)
}

/// Sticky-note text for one aggregated group.
pub fn format_aggregated(rank: usize, item: &AggregatedItem) -> String {
    format!("{rank:03}. {}({:.1})", item.text, item.percentage)
}

/// Builds the note texts for the selected mode, plus the aggregated view
/// when one was computed (for the file sink).
pub fn build_notes(
    rows: &[ParsedRow],
    mode: DeliveryMode,
    basis: PercentBasis,
) -> (Vec<String>, Option<Vec<AggregatedItem>>) {
    match mode {
        DeliveryMode::Verbatim => (
            rows.iter()
                .enumerate()
                .map(|(ordinal, row)| format_verbatim(ordinal, row))
                .collect(),
            None,
        ),
        DeliveryMode::Aggregated => {
            let items = aggregate(rows, basis);
            let notes = items
                .iter()
                .enumerate()
                .map(|(rank, item)| format_aggregated(rank, item))
                .collect();
            (notes, Some(items))
        }
    }
}

/// Writes the raw parsed table. Three-column rows get their split fields
/// as extra columns.
pub fn write_rows(path: &Path, rows: &[ParsedRow]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;
    let three_column = rows.iter().any(|r| r.reframe.is_some());

    if three_column {
        writer.write_record([
            "choice_index",
            "text",
            "negative_reason",
            "positive_reframe",
            "category",
        ])?;
        for row in rows {
            let index = row.choice_index.to_string();
            let reframe = row.reframe.as_ref();
            writer.write_record([
                index.as_str(),
                row.text.as_str(),
                reframe.map_or("", |r| r.negative_reason.as_str()),
                reframe.map_or("", |r| r.positive_reframe.as_str()),
                reframe.map_or("", |r| r.category.as_str()),
            ])?;
        }
    } else {
        writer.write_record(["choice_index", "text"])?;
        for row in rows {
            let index = row.choice_index.to_string();
            writer.write_record([index.as_str(), row.text.as_str()])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes the aggregated table.
pub fn write_aggregated(path: &Path, items: &[AggregatedItem]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["text", "count", "percentage"])?;
    for item in items {
        let count = item.count.to_string();
        let percentage = format!("{:.1}", item.percentage);
        writer.write_record([item.text.as_str(), count.as_str(), percentage.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Posts the prompt as the first note, then every prepared note in order.
/// Returns the number of stickies posted. The first failing call aborts
/// the remainder; already-posted notes stay on the board.
pub async fn deliver(
    prompt: &str,
    notes: &[String],
    miro: &MiroClient,
) -> Result<usize, PipelineError> {
    miro.add_sticky(prompt).await?;
    let mut posted = 1;
    for note in notes {
        miro.add_sticky(note).await?;
        posted += 1;
    }
    info!("posted {posted} stickies to board {}", miro.board_id());
    Ok(posted)
}
