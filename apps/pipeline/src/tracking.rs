//! Experiment tracking — a thin client for the MLflow REST 2.0 API, behind
//! a trait so runs without a tracking server fall back to a no-op.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::PipelineError;

/// Run-metadata sink. One run per pipeline invocation.
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn start_run(&mut self, experiment: &str, run_name: &str) -> Result<(), PipelineError>;
    async fn log_param(&self, key: &str, value: &str) -> Result<(), PipelineError>;
    async fn log_metric(&self, key: &str, value: f64) -> Result<(), PipelineError>;
    async fn end_run(&self) -> Result<(), PipelineError>;
}

/// Selects the tracker implementation from the optional tracking URI.
pub fn tracker_from_uri(tracking_uri: Option<&str>) -> Box<dyn Tracker> {
    match tracking_uri {
        Some(uri) => Box::new(MlflowTracker::new(uri.to_string())),
        None => Box::new(NoopTracker::new()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// No-op tracker
// ────────────────────────────────────────────────────────────────────────────

/// Used when no tracking URI is configured. Params and metrics only reach
/// the log output, tagged with a local run id.
pub struct NoopTracker {
    local_run_id: Uuid,
}

impl NoopTracker {
    pub fn new() -> Self {
        Self {
            local_run_id: Uuid::new_v4(),
        }
    }
}

impl Default for NoopTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tracker for NoopTracker {
    async fn start_run(&mut self, experiment: &str, run_name: &str) -> Result<(), PipelineError> {
        info!(
            "tracking disabled; local run {} (experiment='{experiment}', run_name='{run_name}')",
            self.local_run_id
        );
        Ok(())
    }

    async fn log_param(&self, key: &str, value: &str) -> Result<(), PipelineError> {
        debug!("[{}] param {key}={value}", self.local_run_id);
        Ok(())
    }

    async fn log_metric(&self, key: &str, value: f64) -> Result<(), PipelineError> {
        debug!("[{}] metric {key}={value}", self.local_run_id);
        Ok(())
    }

    async fn end_run(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MLflow tracker
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExperimentResponse {
    experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

/// MLflow REST 2.0 client. Creates the experiment on first use if the
/// server does not know it yet.
pub struct MlflowTracker {
    client: Client,
    base_url: String,
    run_id: Option<String>,
}

impl MlflowTracker {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            run_id: None,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{path}", self.base_url)
    }

    fn run_id(&self) -> Result<&str, PipelineError> {
        self.run_id
            .as_deref()
            .ok_or_else(|| PipelineError::Tracking("no active run; call start_run first".into()))
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<String, PipelineError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PipelineError::Tracking(format!(
                "{path} failed with {status}: {text}"
            )));
        }
        Ok(text)
    }

    async fn experiment_id(&self, name: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .get(self.endpoint("experiments/get-by-name"))
            .query(&[("experiment_name", name)])
            .send()
            .await?;

        if response.status().is_success() {
            let parsed: ExperimentResponse = response.json().await?;
            return Ok(parsed.experiment.experiment_id);
        }

        let created = self
            .post("experiments/create", json!({ "name": name }))
            .await?;
        let parsed: CreateExperimentResponse = serde_json::from_str(&created)?;
        Ok(parsed.experiment_id)
    }
}

#[async_trait]
impl Tracker for MlflowTracker {
    async fn start_run(&mut self, experiment: &str, run_name: &str) -> Result<(), PipelineError> {
        let experiment_id = self.experiment_id(experiment).await?;
        let body = self
            .post(
                "runs/create",
                json!({
                    "experiment_id": experiment_id,
                    "run_name": run_name,
                    "start_time": Utc::now().timestamp_millis(),
                }),
            )
            .await?;
        let parsed: RunResponse = serde_json::from_str(&body)?;
        info!("tracking run {} started on {}", parsed.run.info.run_id, self.base_url);
        self.run_id = Some(parsed.run.info.run_id);
        Ok(())
    }

    async fn log_param(&self, key: &str, value: &str) -> Result<(), PipelineError> {
        let run_id = self.run_id()?;
        self.post(
            "runs/log-parameter",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )
        .await?;
        Ok(())
    }

    async fn log_metric(&self, key: &str, value: f64) -> Result<(), PipelineError> {
        let run_id = self.run_id()?;
        self.post(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": Utc::now().timestamp_millis(),
            }),
        )
        .await?;
        Ok(())
    }

    async fn end_run(&self) -> Result<(), PipelineError> {
        let run_id = self.run_id()?;
        self.post(
            "runs/update",
            json!({
                "run_id": run_id,
                "status": "FINISHED",
                "end_time": Utc::now().timestamp_millis(),
            }),
        )
        .await?;
        Ok(())
    }
}
