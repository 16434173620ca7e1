//! MLflow tracker tests against a local mock of the REST 2.0 API.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fusen::tracking::{MlflowTracker, Tracker};

#[tokio::test]
async fn start_run_reuses_an_existing_experiment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/experiments/get-by-name"))
        .and(query_param("experiment_name", "generate_texts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "experiment": { "experiment_id": "7", "name": "generate_texts" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/create"))
        .and(body_partial_json(json!({ "experiment_id": "7", "run_name": "develop" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": { "info": { "run_id": "r-1" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/log-parameter"))
        .and(body_partial_json(json!({ "run_id": "r-1", "key": "model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/log-metric"))
        .and(body_partial_json(json!({ "run_id": "r-1", "key": "elapsed_time", "value": 1.25 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/update"))
        .and(body_partial_json(json!({ "run_id": "r-1", "status": "FINISHED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut tracker = MlflowTracker::new(server.uri());
    tracker.start_run("generate_texts", "develop").await.unwrap();
    tracker.log_param("model", "gpt-3.5-turbo-0613").await.unwrap();
    tracker.log_metric("elapsed_time", 1.25).await.unwrap();
    tracker.end_run().await.unwrap();
}

#[tokio::test]
async fn start_run_creates_the_experiment_when_unknown() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/mlflow/experiments/get-by-name"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": "RESOURCE_DOES_NOT_EXIST"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/experiments/create"))
        .and(body_partial_json(json!({ "name": "parse_texts" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "experiment_id": "42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/mlflow/runs/create"))
        .and(body_partial_json(json!({ "experiment_id": "42" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": { "info": { "run_id": "r-2" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut tracker = MlflowTracker::new(server.uri());
    tracker.start_run("parse_texts", "develop").await.unwrap();
}
