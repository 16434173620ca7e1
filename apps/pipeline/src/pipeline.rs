//! Pipeline orchestration.
//!
//! Flow: load credentials → build prompt → generation call → dump raw
//! response + prompt to artifact files → parse → (aggregate) → write table
//! → fan out stickies. Each stage is also invokable on its own against a
//! previously dumped response, so delivery can be retried without
//! regenerating.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::aggregate::PercentBasis;
use crate::config::{Credentials, Settings};
use crate::deliver::{build_notes, deliver, write_aggregated, write_rows, DeliveryMode};
use crate::errors::PipelineError;
use crate::llm_client::{create_csv_file_function, ChatResponse, OpenAiClient};
use crate::miro::MiroClient;
use crate::parser::{parse, ParsedRow};
use crate::prompts::{build_prompt, ParseMode};
use crate::tracking::{tracker_from_uri, Tracker};

/// Everything a run needs, constructed once and passed to each stage.
/// Nothing here is built as an import side effect.
pub struct PipelineContext {
    pub openai: OpenAiClient,
    pub miro: Option<MiroClient>,
    pub tracker: Box<dyn Tracker>,
}

impl PipelineContext {
    /// Loads credentials and wires up the clients. The board id argument
    /// wins over the credential file's `miro.board_id`; when neither is
    /// present the context has no sticky-note client and delivery stages
    /// refuse to run.
    pub fn new(
        settings: &Settings,
        credential_path: &Path,
        board_id: Option<String>,
        wait: Duration,
        tracking_uri: Option<String>,
    ) -> Result<Self, PipelineError> {
        let credentials = Credentials::load(credential_path)?;

        let openai = OpenAiClient::new(credentials.openai.api_key.clone());
        let miro = board_id
            .or_else(|| credentials.miro.board_id.clone())
            .map(|board| {
                MiroClient::new(credentials.miro.access_token.clone(), board, wait)
            });

        let tracker = tracker_from_uri(
            tracking_uri
                .as_deref()
                .or(settings.tracking_uri.as_deref()),
        );

        Ok(Self {
            openai,
            miro,
            tracker,
        })
    }

    fn miro(&self) -> Result<&MiroClient, PipelineError> {
        self.miro.as_ref().ok_or_else(|| {
            PipelineError::Config(
                "no board id: pass one on the command line or set miro.board_id".to_string(),
            )
        })
    }
}

/// Generation stage: one chat call, raw response and prompt dumped to the
/// given paths before anything downstream runs, usage counters and timing
/// recorded on the tracker.
pub async fn run_generate(
    ctx: &PipelineContext,
    mode: ParseMode,
    n: u32,
    response_path: &Path,
    prompt_path: &Path,
) -> Result<ChatResponse, PipelineError> {
    let prompt = build_prompt(mode);
    info!("prompt:\n{prompt}");

    let functions = [create_csv_file_function()];
    let outcome = ctx.openai.chat(prompt, Some(&functions), n).await?;
    let response = outcome.response;

    info!(
        "generated {} choices in {:.2}s",
        response.choices.len(),
        outcome.elapsed.as_secs_f64()
    );

    // Checkpoint before delivery is ever attempted.
    fs::write(response_path, serde_json::to_string_pretty(&response)?)?;
    fs::write(prompt_path, prompt)?;

    let tracker = &ctx.tracker;
    tracker
        .log_metric("elapsed_time", outcome.elapsed.as_secs_f64())
        .await?;
    tracker
        .log_metric("prompt_tokens", f64::from(response.usage.prompt_tokens))
        .await?;
    tracker
        .log_metric(
            "completion_tokens",
            f64::from(response.usage.completion_tokens),
        )
        .await?;
    tracker
        .log_metric("total_tokens", f64::from(response.usage.total_tokens))
        .await?;
    tracker.log_param("model", &response.model).await?;
    tracker
        .log_param("n_choices", &response.choices.len().to_string())
        .await?;
    tracker
        .log_param("response_path", &response_path.display().to_string())
        .await?;
    tracker
        .log_param("prompt_path", &prompt_path.display().to_string())
        .await?;

    Ok(response)
}

/// Reads a previously dumped raw response.
pub fn load_response(path: &Path) -> Result<ChatResponse, PipelineError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Parse stage: dumped response in, row table CSV out.
pub async fn run_parse(
    ctx: &PipelineContext,
    input: &Path,
    output: &Path,
    mode: ParseMode,
) -> Result<Vec<ParsedRow>, PipelineError> {
    let response = load_response(input)?;
    let rows = parse(&response, mode)?;
    write_rows(output, &rows)?;
    info!("parsed {} rows into {}", rows.len(), output.display());

    ctx.tracker
        .log_metric("n_rows", rows.len() as f64)
        .await?;
    ctx.tracker
        .log_param("table_path", &output.display().to_string())
        .await?;
    Ok(rows)
}

/// Delivery stage: parses rows out of an in-memory response, writes the
/// table file first, then fans notes out to the board. The file sink is
/// independent of posting success.
pub async fn run_deliver(
    ctx: &PipelineContext,
    response: &ChatResponse,
    prompt: &str,
    output: &Path,
    mode: ParseMode,
    delivery: DeliveryMode,
    basis: PercentBasis,
) -> Result<usize, PipelineError> {
    let rows = parse(response, mode)?;
    let (notes, aggregated) = build_notes(&rows, delivery, basis);

    match &aggregated {
        Some(items) => write_aggregated(output, items)?,
        None => write_rows(output, &rows)?,
    }
    info!("wrote table to {}", output.display());

    let posted = deliver(prompt, &notes, ctx.miro()?).await?;

    ctx.tracker
        .log_metric("n_rows", rows.len() as f64)
        .await?;
    ctx.tracker
        .log_metric("n_stickies", posted as f64)
        .await?;
    ctx.tracker
        .log_param("table_path", &output.display().to_string())
        .await?;
    Ok(posted)
}

/// Full pipeline in one process: generate, dump, parse, write, deliver.
#[allow(clippy::too_many_arguments)]
pub async fn run_all(
    ctx: &PipelineContext,
    mode: ParseMode,
    n: u32,
    response_path: &Path,
    prompt_path: &Path,
    table_path: &Path,
    delivery: DeliveryMode,
    basis: PercentBasis,
) -> Result<usize, PipelineError> {
    let response = run_generate(ctx, mode, n, response_path, prompt_path).await?;
    run_deliver(
        ctx,
        &response,
        build_prompt(mode),
        table_path,
        mode,
        delivery,
        basis,
    )
    .await
}
