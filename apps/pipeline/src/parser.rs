//! Response parser — turns a raw multi-completion response into a flat
//! table of (choice-index, text) rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PipelineError;
use crate::llm_client::functions::CreateCsvFileArgs;
use crate::llm_client::{ChatResponse, CompletionPayload, CREATE_CSV_FILE};
use crate::prompts::{ParseMode, CSV_HEADER_POSITIVE};

/// One parsed line, tagged with the choice it came from.
/// Invariant: `text` is non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRow {
    pub choice_index: u32,
    pub text: String,
    /// Present only in three-column mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reframe: Option<Reframe>,
}

/// The three-column breakdown of a CSV-mode row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reframe {
    pub negative_reason: String,
    pub positive_reframe: String,
    pub category: String,
}

/// Extracts rows from every choice, in response order.
///
/// Function calls named `create_csv_file` contribute their decoded `text`
/// argument; free-text choices contribute their content directly; choices
/// with neither are skipped and logged. Fails with `NoContent` when no
/// choice yields a single row (including a zero-choice response).
pub fn parse(response: &ChatResponse, mode: ParseMode) -> Result<Vec<ParsedRow>, PipelineError> {
    let mut rows = Vec::new();

    for choice in &response.choices {
        match choice.payload() {
            CompletionPayload::FunctionCall { name, arguments } if name == CREATE_CSV_FILE => {
                let args: CreateCsvFileArgs = serde_json::from_str(arguments)?;
                collect_lines(&args.text, choice.index, mode, &mut rows);
            }
            CompletionPayload::FunctionCall { name, .. } => {
                debug!(
                    "skipping choice {}: unexpected function call '{name}'",
                    choice.index
                );
            }
            CompletionPayload::Text(text) => collect_lines(text, choice.index, mode, &mut rows),
            CompletionPayload::Empty => {
                debug!("skipping choice {}: no content", choice.index);
            }
        }
    }

    if rows.is_empty() {
        return Err(PipelineError::NoContent);
    }
    Ok(rows)
}

fn collect_lines(text: &str, choice_index: u32, mode: ParseMode, rows: &mut Vec<ParsedRow>) {
    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match mode {
            ParseMode::List => {
                let cleaned = strip_bullet(line);
                if !cleaned.is_empty() {
                    rows.push(ParsedRow {
                        choice_index,
                        text: cleaned.to_string(),
                        reframe: None,
                    });
                }
            }
            ParseMode::Csv => {
                if let Some(reframe) = parse_csv_line(line) {
                    rows.push(ParsedRow {
                        choice_index,
                        text: line.to_string(),
                        reframe: Some(reframe),
                    });
                }
            }
        }
    }
}

/// Drops a leading list marker ("-", "*", "・") and surrounding whitespace.
fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(['-', '*', '・']).trim()
}

/// A CSV-mode line is kept iff it splits into exactly three fields and the
/// second field is not the literal header label the prompt's example shows
/// (the service sometimes echoes the header back).
fn parse_csv_line(line: &str) -> Option<Reframe> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        debug!("dropping malformed line: {line}");
        return None;
    }
    if fields[1] == CSV_HEADER_POSITIVE {
        debug!("dropping header echo: {line}");
        return None;
    }
    Some(Reframe {
        negative_reason: fields[0].to_string(),
        positive_reframe: fields[1].to_string(),
        category: fields[2].to_string(),
    })
}
