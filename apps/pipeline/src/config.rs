use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::PipelineError;

/// Default inter-request pause after every sticky-note call.
/// A fixed client-side rate limiter, not adaptive.
pub const DEFAULT_STICKY_WAIT: Duration = Duration::from_secs(1);

/// Credential bundle loaded once per run from a YAML file.
///
/// Expected shape:
/// ```yaml
/// openai:
///   api_key: sk-...
/// miro:
///   access_token: ...
///   board_id: uXjVM9oIaSw=   # optional, CLI argument wins
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub openai: OpenAiCredentials,
    pub miro: MiroCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiCredentials {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiroCredentials {
    pub access_token: String,
    #[serde(default)]
    pub board_id: Option<String>,
}

impl Credentials {
    /// Reads and parses the credential file. A missing or malformed file is
    /// fatal before any network call is made.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "failed to read credential file {}: {e}",
                path.display()
            ))
        })?;
        serde_yaml::from_str(&raw).map_err(|e| {
            PipelineError::Config(format!(
                "failed to parse credential file {}: {e}",
                path.display()
            ))
        })
    }
}

/// Environment-driven settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// MLflow-compatible tracking server base URL, e.g. http://localhost:5000.
    /// When absent, tracking is a no-op.
    pub tracking_uri: Option<String>,
    pub credential_path: String,
    pub sticky_wait: Duration,
    pub rust_log: String,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let sticky_wait = std::env::var("FUSEN_STICKY_WAIT_SECS")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_STICKY_WAIT);

        Settings {
            tracking_uri: std::env::var("MLFLOW_TRACKING_URI").ok(),
            credential_path: std::env::var("FUSEN_CREDENTIAL_PATH")
                .unwrap_or_else(|_| "config/credential.yaml".to_string()),
            sticky_wait,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
