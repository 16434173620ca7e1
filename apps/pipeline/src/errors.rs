use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Pipeline-level error type.
/// Every stage returns `Result<T, PipelineError>`; errors are fatal and
/// propagate to the CLI layer, which logs and exits non-zero.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Generation API error (status {status}): {message}")]
    Generation { status: u16, message: String },

    #[error("No content: every completion parsed to zero rows")]
    NoContent,

    #[error("Delivery error (status {status}): {body}")]
    Delivery { status: u16, body: String },

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lets the demo form's handlers return `Result<T, PipelineError>`.
impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            PipelineError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            PipelineError::Generation { .. } => (StatusCode::BAD_GATEWAY, "GENERATION_ERROR"),
            PipelineError::NoContent => (StatusCode::UNPROCESSABLE_ENTITY, "NO_CONTENT"),
            PipelineError::Delivery { .. } => (StatusCode::BAD_GATEWAY, "DELIVERY_ERROR"),
            PipelineError::Tracking(_) => (StatusCode::BAD_GATEWAY, "TRACKING_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        tracing::error!("{self}");

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}
