/// LLM Client — the completion collaborator for the run pipeline.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Agents talk to a `CompletionService`; `LlmClient` is the production one and
/// `pipeline::stub::StubCompletion` is the no-model stand-in.
///
/// Models are hardcoded per tier.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used for extraction, scoring and the truth guard.
pub const FAST_MODEL: &str = "claude-haiku-4-5";
/// Model used for rewriting (tailored resume, cover letter).
pub const QUALITY_MODEL: &str = "claude-sonnet-4-5";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Which model family serves a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Fast,
    Quality,
}

impl ModelTier {
    pub fn model(self) -> &'static str {
        match self {
            ModelTier::Fast => FAST_MODEL,
            ModelTier::Quality => QUALITY_MODEL,
        }
    }
}

/// A single-shot completion request: fixed instruction plus per-call content.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub instruction: &'a str,
    pub content: &'a str,
    pub tier: ModelTier,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens as u64 + self.output_tokens as u64
    }
}

/// Raw model output. `usage` is `None` when the backend cannot report it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// The completion collaborator. Implement this to swap backends without
/// touching the agents or the orchestrator.
///
/// Held by the orchestrator as `Arc<dyn CompletionService>`.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API client with retry on rate limits and 5xx.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        tier: ModelTier,
        max_tokens: u32,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: tier.model(),
            max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            if let Some(usage) = &llm_response.usage {
                debug!(
                    "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
                    tier.model(),
                    usage.input_tokens,
                    usage.output_tokens
                );
            }

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let response = self
            .call(
                request.content,
                request.instruction,
                request.tier,
                request.max_output_tokens,
            )
            .await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?.to_string();

        Ok(Completion {
            text,
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_models_are_distinct() {
        assert_eq!(ModelTier::Fast.model(), FAST_MODEL);
        assert_eq!(ModelTier::Quality.model(), QUALITY_MODEL);
        assert_ne!(FAST_MODEL, QUALITY_MODEL);
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let json = r#"{
            "content": [
                {"type": "tool_use", "text": null},
                {"type": "text", "text": "{\"ok\": true}"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 5}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"ok\": true}"));
        assert_eq!(response.usage.unwrap().total(), 17);
    }

    #[test]
    fn test_response_without_usage_deserializes() {
        let json = r#"{"content": [{"type": "text", "text": "hi"}]}"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert!(response.usage.is_none());
    }
}
