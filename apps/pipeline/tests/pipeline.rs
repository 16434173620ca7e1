//! Stage-level tests: re-parsing a dumped response and delivering it,
//! exercising the checkpoint flow the raw response dump exists for.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fusen::aggregate::PercentBasis;
use fusen::deliver::DeliveryMode;
use fusen::llm_client::OpenAiClient;
use fusen::miro::MiroClient;
use fusen::pipeline::{load_response, run_deliver, run_parse, PipelineContext};
use fusen::prompts::ParseMode;
use fusen::tracking::NoopTracker;

fn dumped_response() -> serde_json::Value {
    json!({
        "model": "gpt-3.5-turbo-0613",
        "choices": [
            {
                "index": 0,
                "finish_reason": "function_call",
                "message": {
                    "role": "assistant",
                    "function_call": {
                        "name": "create_csv_file",
                        "arguments": json!({
                            "text": "低賃金,報酬体系の見直し機会,待遇\n長時間労働,働き方の改善機会,環境\n低賃金,報酬体系の見直し機会,待遇"
                        })
                        .to_string()
                    }
                }
            }
        ],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    })
}

fn context(miro: Option<MiroClient>) -> PipelineContext {
    PipelineContext {
        openai: OpenAiClient::with_base_url("unused".to_string(), "http://unused".to_string()),
        miro,
        tracker: Box::new(NoopTracker::new()),
    }
}

#[tokio::test]
async fn parse_stage_reads_a_dump_and_writes_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("response.json");
    let output = dir.path().join("rows.csv");
    std::fs::write(&input, dumped_response().to_string()).unwrap();

    let ctx = context(None);
    let rows = run_parse(&ctx, &input, &output, ParseMode::Csv).await.unwrap();

    assert_eq!(rows.len(), 3);
    let table = std::fs::read_to_string(&output).unwrap();
    assert!(table.starts_with("choice_index,text,negative_reason"));
    assert!(table.contains("長時間労働"));
}

#[tokio::test]
async fn deliver_stage_writes_table_then_posts_aggregated_notes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/boards/b/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3) // prompt + 2 distinct groups
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("response.json");
    let output = dir.path().join("agg.csv");
    std::fs::write(&input, dumped_response().to_string()).unwrap();

    let miro = MiroClient::with_base_url(
        "tok".to_string(),
        "b".to_string(),
        Duration::from_millis(0),
        server.uri(),
    );
    let ctx = context(Some(miro));

    let response = load_response(&input).unwrap();
    let posted = run_deliver(
        &ctx,
        &response,
        "prompt text",
        &output,
        ParseMode::Csv,
        DeliveryMode::Aggregated,
        PercentBasis::Total,
    )
    .await
    .unwrap();

    assert_eq!(posted, 3);
    let table = std::fs::read_to_string(&output).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("text,count,percentage"));
    // Sorted ascending by text ("低賃金" < "長時間労働" in code-point
    // order); counts sum to the 3 input rows.
    let first = lines.next().unwrap();
    let second = lines.next().unwrap();
    assert!(first.starts_with("低賃金") && first.ends_with(",2,66.7"));
    assert!(second.starts_with("長時間労働") && second.ends_with(",1,33.3"));
}

#[tokio::test]
async fn deliver_stage_without_a_board_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("response.json");
    let output = dir.path().join("agg.csv");
    std::fs::write(&input, dumped_response().to_string()).unwrap();

    let ctx = context(None);
    let response = load_response(&input).unwrap();
    let err = run_deliver(
        &ctx,
        &response,
        "prompt text",
        &output,
        ParseMode::Csv,
        DeliveryMode::Aggregated,
        PercentBasis::Total,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, fusen::errors::PipelineError::Config(_)));
    // The table was still written before delivery was attempted.
    assert!(output.exists());
}
