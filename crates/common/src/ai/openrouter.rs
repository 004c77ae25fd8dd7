//! OpenRouter chat-completions client

use crate::ai::{Completion, CompletionRequest, TextGenerator, TokenUsage, UsageMetrics};
use crate::config::AiConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Client for an OpenRouter-compatible `/chat/completions` endpoint
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
    timeout_secs: u64,
    usage: Arc<UsageMetrics>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenRouterClient {
    /// Create a new client. Fails when no API key is configured.
    pub fn new(config: &AiConfig, usage: Arc<UsageMetrics>) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "ai.api_key is required unless ai.use_mock is enabled".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
            timeout_secs: config.timeout_secs,
            usage,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::GenerationTimeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            AppError::GenerationService {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

/// Pull a human-readable message out of an error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Map a non-success HTTP status to a generation error
fn classify_status(status: StatusCode, body: &str) -> AppError {
    let detail = error_message(body).unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    let message = match status {
        StatusCode::UNAUTHORIZED => "API key is invalid or expired".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "Rate limit exceeded. Please try again later".to_string(),
        StatusCode::BAD_REQUEST => format!("Bad request: {}", detail),
        s if s.is_server_error() => format!("Server error: {}", detail),
        _ => detail,
    };

    AppError::GenerationService { message }
}

fn into_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AppError::GenerationParse {
            message: "response contains no choices".to_string(),
        })?;

    Ok(Completion {
        model: response.model.unwrap_or_else(|| requested_model.to_string()),
        content,
        usage: response.usage,
    })
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        tracing::debug!(model = %model, url = %url, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "CardForge")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %model, "AI provider returned an error");
            return Err(classify_status(status, &text));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                AppError::GenerationParse {
                    message: format!("Failed to decode provider response: {}", e),
                }
            }
        })?;

        let completion = into_completion(parsed, model)?;

        self.usage.log_request(&completion.model);
        if let Some(usage) = completion.usage {
            self.usage
                .log_token_usage(&completion.model, usage.prompt_tokens, usage.completion_tokens);
        }

        Ok(completion)
    }

    fn model_name(&self) -> &str {
        &self.default_model
    }
}
