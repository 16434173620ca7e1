//! Sticky-note client for the Miro REST v1 API.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::PipelineError;

const MIRO_API_URL: &str = "https://api.miro.com/v1";
const STICKER_FONT_SIZE: u32 = 40;

/// Wraps the board "create widget" endpoint. One sticky per call, with a
/// fixed pause after every request as a crude client-side rate limiter.
#[derive(Clone)]
pub struct MiroClient {
    client: Client,
    access_token: String,
    board_id: String,
    base_url: String,
    /// Unconditional pause after every call, success or failure.
    wait: Duration,
}

impl MiroClient {
    pub fn new(access_token: String, board_id: String, wait: Duration) -> Self {
        Self::with_base_url(access_token, board_id, wait, MIRO_API_URL.to_string())
    }

    /// Point the client at a different endpoint (local mock servers in tests).
    pub fn with_base_url(
        access_token: String,
        board_id: String,
        wait: Duration,
        base_url: String,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            access_token,
            board_id,
            base_url,
            wait,
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Posts one sticky note and returns the raw response body.
    /// Non-success statuses surface as `Delivery` errors; the pause is
    /// applied either way so a failing batch still respects the limiter.
    pub async fn add_sticky(&self, text: &str) -> Result<String, PipelineError> {
        let payload = build_sticker_payload(text);
        let result = self.create_widget(&payload).await;
        tokio::time::sleep(self.wait).await;
        result
    }

    async fn create_widget(&self, payload: &Value) -> Result<String, PipelineError> {
        let url = format!("{}/boards/{}/widgets", self.base_url, self.board_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!("miro response ({status}): {body}");

        if !status.is_success() {
            return Err(PipelineError::Delivery {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Builds the widget payload for a single text sticker.
pub fn build_sticker_payload(text: &str) -> Value {
    json!({
        "type": "sticker",
        "style": { "fontSize": STICKER_FONT_SIZE },
        "text": format!("<p>{text}</p>"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sticker_payload_shape() {
        let payload = build_sticker_payload("低賃金");
        assert_eq!(payload["type"], "sticker");
        assert_eq!(payload["style"]["fontSize"], 40);
        assert_eq!(payload["text"], "<p>低賃金</p>");
    }

    #[test]
    fn test_sticker_payload_has_no_extra_keys() {
        let payload = build_sticker_payload("x");
        assert_eq!(payload.as_object().unwrap().len(), 3);
    }
}
