//! Demo web form for ad-hoc testing of the sticky-note client.
//!
//! Explicitly invoked via the `serve` subcommand; nothing here runs as an
//! import side effect.

use std::net::SocketAddr;

use axum::{
    response::Html,
    routing::{get, post},
    Json, Router,
};
use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::errors::PipelineError;
use crate::miro::MiroClient;

/// State injected into the form's handlers.
#[derive(Clone)]
pub struct ServeState {
    pub miro: MiroClient,
}

const FORM_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>fusen demo</title></head>
<body>
  <h1>Post a sticky</h1>
  <form id="f">
    <input type="text" name="text" placeholder="付箋のテキスト" size="40">
    <button type="submit">Send</button>
  </form>
  <pre id="out"></pre>
  <script>
    document.getElementById('f').addEventListener('submit', async (e) => {
      e.preventDefault();
      const text = new FormData(e.target).get('text');
      const res = await fetch('/sticky', {
        method: 'POST',
        headers: {'content-type': 'application/json'},
        body: JSON.stringify({text}),
      });
      document.getElementById('out').textContent = await res.text();
    });
  </script>
</body>
</html>
"#;

#[derive(Debug, Deserialize)]
pub struct StickyRequest {
    pub text: String,
}

/// GET /
async fn form_handler() -> Html<&'static str> {
    Html(FORM_PAGE)
}

/// GET /health
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "fusen-demo"
    }))
}

/// POST /sticky — posts one note to the configured board.
async fn sticky_handler(
    State(state): State<ServeState>,
    Json(req): Json<StickyRequest>,
) -> Result<Json<Value>, PipelineError> {
    let body = state.miro.add_sticky(&req.text).await?;
    Ok(Json(json!({
        "status": "posted",
        "board_id": state.miro.board_id(),
        "raw": body,
    })))
}

pub fn build_router(state: ServeState) -> Router {
    Router::new()
        .route("/", get(form_handler))
        .route("/health", get(health_handler))
        .route("/sticky", post(sticky_handler))
        .with_state(state)
}

/// Serves the demo form until interrupted.
pub async fn serve(state: ServeState, port: u16) -> Result<(), PipelineError> {
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!("demo form listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_page_posts_to_sticky_endpoint() {
        assert!(FORM_PAGE.contains("fetch('/sticky'"));
    }

    #[test]
    fn test_sticky_request_decodes() {
        let req: StickyRequest = serde_json::from_str("{\"text\":\"低賃金\"}").unwrap();
        assert_eq!(req.text, "低賃金");
    }
}
