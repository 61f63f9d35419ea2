//! Live adapter for the `AgentCaller` port using the Anthropic messages API.

use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::{AgentCaller, AgentFuture, AgentOptions, AgentResponse};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model used when neither the strategy nor `VERITY_AI_MODEL` names one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

const MAX_TOKENS: u32 = 4096;

/// Agent that answers prompts through the Anthropic API.
///
/// Reads the key from `ANTHROPIC_API_KEY` on every call. A missing key or an
/// unreachable API is an `Err`; an API-level error response is reported as an
/// unsuccessful [`AgentResponse`].
pub struct LiveAgentCaller {
    client: Client,
}

impl LiveAgentCaller {
    /// Creates a new live agent caller.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for LiveAgentCaller {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn resolve_model(options: &AgentOptions) -> String {
    options
        .model
        .clone()
        .or_else(|| env::var("VERITY_AI_MODEL").ok().filter(|m| !m.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

impl AgentCaller for LiveAgentCaller {
    fn call(&self, prompt: &str, options: &AgentOptions) -> AgentFuture<'_> {
        let prompt = prompt.to_string();
        let model = resolve_model(options);
        let timeout = options.timeout_ms.map(Duration::from_millis);

        Box::pin(async move {
            let api_key = env::var("ANTHROPIC_API_KEY")
                .map_err(|_| "ANTHROPIC_API_KEY environment variable not set".to_string())?;

            let body = MessagesRequest {
                model: &model,
                max_tokens: MAX_TOKENS,
                messages: vec![Message { role: "user", content: &prompt }],
            };
            debug!(%model, prompt_chars = prompt.len(), "calling agent");

            let mut request = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            let response = request
                .send()
                .await
                .map_err(|e| format!("Anthropic API request failed: {e}"))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| format!("Failed to read Anthropic API response: {e}"))?;

            if !status.is_success() {
                let message = serde_json::from_str::<ApiError>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Ok(AgentResponse {
                    success: false,
                    output: String::new(),
                    agent_used: Some(model),
                    error: Some(format!("Anthropic API error ({}): {message}", status.as_u16())),
                });
            }

            let parsed: MessagesResponse = serde_json::from_str(&text)
                .map_err(|e| format!("Failed to parse Anthropic API response: {e}"))?;
            Ok(AgentResponse {
                success: true,
                output: parsed.content.into_iter().map(|block| block.text).collect(),
                agent_used: Some(parsed.model.unwrap_or(model)),
                error: None,
            })
        })
    }
}
