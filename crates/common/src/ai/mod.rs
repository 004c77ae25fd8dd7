//! AI gateway abstraction
//!
//! Provides a unified interface for text generation backends:
//! - OpenRouter (any chat-completions model it proxies)
//! - A deterministic mock for development and tests
//!
//! Output parsing and prompt text live here too, so callers only deal with
//! question/answer pairs.

mod mock;
mod openrouter;
pub mod parse;
pub mod prompt;
mod usage;

pub use mock::MockGenerator;
pub use openrouter::OpenRouterClient;
pub use parse::{parse_flashcards, ProposedCard};
pub use usage::{ModelUsage, UsageMetrics, UsageSnapshot};

use crate::config::AiConfig;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default model when none is configured
pub const DEFAULT_MODEL: &str = "anthropic/claude-3-haiku";

/// One chat completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Overrides the generator's default model
    pub model: Option<String>,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Raw text returned by a generator
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Model that actually served the request
    pub model: String,
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Trait for text generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one completion. Dropping the future aborts the outstanding call.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Model used when the request does not name one
    fn model_name(&self) -> &str;
}

/// Create a generator from configuration.
///
/// The mock is only returned when `use_mock` is set; a live configuration
/// without an API key is an error.
pub fn create_generator(config: &AiConfig, usage: Arc<UsageMetrics>) -> Result<Arc<dyn TextGenerator>> {
    if config.use_mock {
        tracing::warn!("AI mock mode enabled, generation will not call a real model");
        return Ok(Arc::new(MockGenerator::new().with_usage(usage)));
    }

    let client = OpenRouterClient::new(config, usage)?;
    tracing::info!(
        base_url = %config.base_url,
        model = %config.default_model,
        "AI generator initialized"
    );
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn test_live_config_without_key_is_rejected() {
        let config = AiConfig {
            use_mock: false,
            api_key: None,
            ..AiConfig::default()
        };

        let err = create_generator(&config, Arc::new(UsageMetrics::new())).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_mock_selected_explicitly() {
        let config = AiConfig {
            use_mock: true,
            api_key: None,
            ..AiConfig::default()
        };

        let generator = create_generator(&config, Arc::new(UsageMetrics::new())).unwrap();
        assert_eq!(generator.model_name(), mock::MOCK_MODEL);
    }
}
