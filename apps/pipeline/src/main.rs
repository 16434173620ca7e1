use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fusen::aggregate::PercentBasis;
use fusen::config::Settings;
use fusen::deliver::DeliveryMode;
use fusen::pipeline::{
    load_response, run_all, run_deliver, run_generate, run_parse, PipelineContext,
};
use fusen::prompts::{build_prompt, ParseMode};
use fusen::serve::{serve, ServeState};
use fusen::tracking::Tracker as _;

/// Generates "reasons for job change" via the chat-completion API and posts
/// them as sticky notes onto a Miro board.
#[derive(Parser, Debug)]
#[command(name = "fusen", version)]
struct Cli {
    /// Path to the YAML credential file.
    #[arg(long, global = true)]
    credential: Option<PathBuf>,

    /// MLflow-compatible tracking server URL. Falls back to
    /// MLFLOW_TRACKING_URI; tracking is a no-op when neither is set.
    #[arg(long, global = true)]
    tracking_uri: Option<String>,

    /// Run-name label, used purely for tracking-system grouping.
    #[arg(long, global = true, default_value = "develop")]
    run_name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call the generation service and dump the raw response and prompt.
    Generate {
        /// Where to write the raw response JSON.
        response_out: PathBuf,
        /// Where to write the prompt text.
        prompt_out: PathBuf,
        /// Number of independent completions requested in one call.
        #[arg(long, default_value_t = 10)]
        n: u32,
        #[arg(long, value_enum, default_value = "csv")]
        mode: ParseMode,
    },
    /// Parse a dumped response into a row table CSV.
    Parse {
        /// Raw response dump produced by `generate`.
        input: PathBuf,
        /// Where to write the row table.
        output: PathBuf,
        #[arg(long, value_enum, default_value = "csv")]
        mode: ParseMode,
    },
    /// Parse a dumped response and post the items to a board.
    Deliver {
        /// Raw response dump produced by `generate`.
        input: PathBuf,
        /// Where to write the (possibly aggregated) table.
        output: PathBuf,
        /// Board to post to. Falls back to miro.board_id in the
        /// credential file.
        board_id: Option<String>,
        #[arg(long, value_enum, default_value = "csv")]
        mode: ParseMode,
        #[arg(long, value_enum, default_value = "aggregated")]
        delivery: DeliveryMode,
        #[arg(long, value_enum, default_value = "total")]
        percent_basis: PercentBasis,
        /// Pause after every sticky-note call, in seconds.
        /// Defaults to FUSEN_STICKY_WAIT_SECS or 1.0.
        #[arg(long)]
        wait: Option<f64>,
    },
    /// Full pipeline: generate, dump, parse, write, deliver.
    Run {
        response_out: PathBuf,
        prompt_out: PathBuf,
        table_out: PathBuf,
        board_id: Option<String>,
        #[arg(long, default_value_t = 10)]
        n: u32,
        #[arg(long, value_enum, default_value = "csv")]
        mode: ParseMode,
        #[arg(long, value_enum, default_value = "aggregated")]
        delivery: DeliveryMode,
        #[arg(long, value_enum, default_value = "total")]
        percent_basis: PercentBasis,
        #[arg(long)]
        wait: Option<f64>,
    },
    /// Serve the ad-hoc demo web form.
    Serve {
        board_id: Option<String>,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long)]
        wait: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &settings.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("start process: {:?}", cli.command);

    let credential_path = cli
        .credential
        .unwrap_or_else(|| PathBuf::from(&settings.credential_path));

    let (board_id, wait) = command_board_and_wait(&cli.command, settings.sticky_wait);
    let mut ctx = PipelineContext::new(
        &settings,
        &credential_path,
        board_id,
        wait,
        cli.tracking_uri,
    )?;

    ctx.tracker
        .start_run(experiment_name(&cli.command), &cli.run_name)
        .await?;
    ctx.tracker
        .log_param("args.run_name", &cli.run_name)
        .await?;

    match cli.command {
        Command::Generate {
            response_out,
            prompt_out,
            n,
            mode,
        } => {
            ctx.tracker.log_param("args.n", &n.to_string()).await?;
            run_generate(&ctx, mode, n, &response_out, &prompt_out).await?;
        }
        Command::Parse {
            input,
            output,
            mode,
        } => {
            run_parse(&ctx, &input, &output, mode).await?;
        }
        Command::Deliver {
            input,
            output,
            mode,
            delivery,
            percent_basis,
            ..
        } => {
            let response = load_response(&input)?;
            run_deliver(
                &ctx,
                &response,
                build_prompt(mode),
                &output,
                mode,
                delivery,
                percent_basis,
            )
            .await?;
        }
        Command::Run {
            response_out,
            prompt_out,
            table_out,
            n,
            mode,
            delivery,
            percent_basis,
            ..
        } => {
            ctx.tracker.log_param("args.n", &n.to_string()).await?;
            run_all(
                &ctx,
                mode,
                n,
                &response_out,
                &prompt_out,
                &table_out,
                delivery,
                percent_basis,
            )
            .await?;
        }
        Command::Serve { port, .. } => {
            let miro = ctx.miro.clone().ok_or_else(|| {
                anyhow::anyhow!("serve requires a board id (argument or credential file)")
            })?;
            serve(ServeState { miro }, port).await?;
        }
    }

    ctx.tracker.end_run().await?;
    info!("complete process");
    Ok(())
}

fn experiment_name(command: &Command) -> &'static str {
    match command {
        Command::Generate { .. } => "generate_texts",
        Command::Parse { .. } => "parse_texts",
        Command::Deliver { .. } => "deliver_texts",
        Command::Run { .. } => "fusen_pipeline",
        Command::Serve { .. } => "fusen_demo",
    }
}

fn command_board_and_wait(command: &Command, default_wait: Duration) -> (Option<String>, Duration) {
    match command {
        Command::Deliver { board_id, wait, .. }
        | Command::Run { board_id, wait, .. }
        | Command::Serve { board_id, wait, .. } => {
            let wait = wait.map(Duration::from_secs_f64).unwrap_or(default_wait);
            (board_id.clone(), wait)
        }
        _ => (None, default_wait),
    }
}
