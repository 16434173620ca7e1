//! Generation client — the single point of entry for all chat-completion
//! calls in the pipeline. No other module talks to the OpenAI API directly.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::PipelineError;

pub mod functions;

pub use functions::{create_csv_file_function, FunctionDef, CREATE_CSV_FILE};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
/// The model used for all generation calls.
/// Intentionally hardcoded to keep runs comparable across experiments.
pub const MODEL: &str = "gpt-3.5-turbo-0613";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [FunctionDef]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'a str>,
    n: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// One candidate output from the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub finish_reason: String,
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

/// A structured call the model chose to emit instead of free text.
/// `arguments` is a JSON document encoded as a string, per the API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Full response of one generation call. Persisted verbatim as the raw
/// response dump so parsing and delivery can be re-run without regenerating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

/// Tagged view of a choice's payload, decoded once at the service boundary
/// instead of being inspected by string key during parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionPayload<'a> {
    /// `finish_reason == "function_call"`: name plus the raw argument blob.
    FunctionCall { name: &'a str, arguments: &'a str },
    /// Plain assistant text.
    Text(&'a str),
    /// Neither a structured call nor textual content.
    Empty,
}

impl Choice {
    pub fn payload(&self) -> CompletionPayload<'_> {
        if self.finish_reason == "function_call" {
            if let Some(call) = &self.message.function_call {
                return CompletionPayload::FunctionCall {
                    name: &call.name,
                    arguments: &call.arguments,
                };
            }
        }
        match self.message.content.as_deref() {
            Some(text) => CompletionPayload::Text(text),
            None => CompletionPayload::Empty,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Outcome of one generation call: the decoded response plus the elapsed
/// wall-clock time, for the experiment tracker.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub response: ChatResponse,
    pub elapsed: Duration,
}

/// Thin wrapper over the chat-completions endpoint.
/// One outbound call per `chat` invocation; failures are not retried.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL.to_string())
    }

    /// Point the client at a different endpoint (local mock servers in tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url,
        }
    }

    /// Requests `n` independent completions for `prompt` in one call.
    /// `n` is trusted to be positive; the service rejects anything else.
    pub async fn chat(
        &self,
        prompt: &str,
        functions: Option<&[FunctionDef]>,
        n: u32,
    ) -> Result<GenerationOutcome, PipelineError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            functions,
            function_call: functions.map(|_| "auto"),
            n,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("generation call failed with {status}: {message}");
            return Err(PipelineError::Generation {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        let elapsed = start.elapsed();

        debug!(
            "generation call succeeded: model={}, n_choices={}, total_tokens={}",
            chat_response.model,
            chat_response.choices.len(),
            chat_response.usage.total_tokens
        );

        Ok(GenerationOutcome {
            response: chat_response,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(finish_reason: &str, content: Option<&str>, call: Option<FunctionCall>) -> Choice {
        Choice {
            index: 0,
            finish_reason: finish_reason.to_string(),
            message: ResponseMessage {
                role: "assistant".to_string(),
                content: content.map(str::to_string),
                function_call: call,
            },
        }
    }

    #[test]
    fn test_payload_function_call() {
        let c = choice(
            "function_call",
            None,
            Some(FunctionCall {
                name: "create_csv_file".to_string(),
                arguments: "{\"text\":\"a\\nb\"}".to_string(),
            }),
        );
        assert_eq!(
            c.payload(),
            CompletionPayload::FunctionCall {
                name: "create_csv_file",
                arguments: "{\"text\":\"a\\nb\"}"
            }
        );
    }

    #[test]
    fn test_payload_free_text() {
        let c = choice("stop", Some("- 低賃金"), None);
        assert_eq!(c.payload(), CompletionPayload::Text("- 低賃金"));
    }

    #[test]
    fn test_payload_empty_when_no_content() {
        let c = choice("stop", None, None);
        assert_eq!(c.payload(), CompletionPayload::Empty);
    }

    #[test]
    fn test_function_call_finish_reason_without_call_falls_back_to_content() {
        // Defensive decode: a "function_call" finish_reason with no call
        // object still yields whatever content is present.
        let c = choice("function_call", Some("text"), None);
        assert_eq!(c.payload(), CompletionPayload::Text("text"));
    }

    #[test]
    fn test_chat_request_omits_functions_when_absent() {
        let req = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: "p",
            }],
            functions: None,
            function_call: None,
            n: 3,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("functions").is_none());
        assert!(json.get("function_call").is_none());
        assert_eq!(json["n"], 3);
    }
}
