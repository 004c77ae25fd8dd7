//! Mock generator for development and tests

use crate::ai::{Completion, CompletionRequest, TextGenerator, TokenUsage, UsageMetrics};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MOCK_MODEL: &str = "mock/flashcards";

/// Cards derived per request when no fixed response is set
const DERIVED_CARDS: usize = 5;
const MIN_SENTENCE_CHARS: usize = 20;
const FRONT_WORDS: usize = 6;
const MAX_SIDE_CHARS: usize = 200;

enum Behavior {
    /// Build cards from the sentences of the source text
    Derived,
    /// Return this content verbatim
    Fixed(String),
    /// Fail with a service error carrying this message
    Fail(String),
}

/// Deterministic generator that never leaves the process
pub struct MockGenerator {
    behavior: Behavior,
    delay: Option<Duration>,
    usage: Option<Arc<UsageMetrics>>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            behavior: Behavior::Derived,
            delay: None,
            usage: None,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Always answer with `content`
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.behavior = Behavior::Fixed(content.into());
        self
    }

    /// Always fail as an unavailable service
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behavior = Behavior::Fail(message.into());
        self
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_usage(mut self, usage: Arc<UsageMetrics>) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Calls started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to completion (not dropped mid-flight)
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Text between `<source>` tags, or the whole prompt
fn source_section(prompt: &str) -> &str {
    match (prompt.find("<source>"), prompt.rfind("</source>")) {
        (Some(start), Some(end)) if start + "<source>".len() <= end => {
            &prompt[start + "<source>".len()..end]
        }
        _ => prompt,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn derive_cards(source: &str) -> Vec<serde_json::Value> {
    source
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() >= MIN_SENTENCE_CHARS)
        .take(DERIVED_CARDS)
        .map(|sentence| {
            let topic: Vec<&str> = sentence.split_whitespace().take(FRONT_WORDS).collect();
            json!({
                "front": truncate_chars(&format!("What does the text say about \"{}\"?", topic.join(" ")), MAX_SIDE_CHARS),
                "back": truncate_chars(sentence, MAX_SIDE_CHARS),
            })
        })
        .collect()
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = match &self.behavior {
            Behavior::Derived => {
                json!({ "flashcards": derive_cards(source_section(&request.user)) }).to_string()
            }
            Behavior::Fixed(content) => content.clone(),
            Behavior::Fail(message) => {
                return Err(AppError::GenerationService {
                    message: message.clone(),
                })
            }
        };

        let model = request.model.clone().unwrap_or_else(|| MOCK_MODEL.to_string());
        let usage = TokenUsage {
            prompt_tokens: (request.system.len() + request.user.len()) as u64 / 4,
            completion_tokens: content.len() as u64 / 4,
            total_tokens: 0,
        };

        if let Some(metrics) = &self.usage {
            metrics.log_request(&model);
            metrics.log_token_usage(&model, usage.prompt_tokens, usage.completion_tokens);
        }

        self.completed.fetch_add(1, Ordering::SeqCst);

        Ok(Completion {
            model,
            content,
            usage: Some(TokenUsage {
                total_tokens: usage.prompt_tokens + usage.completion_tokens,
                ..usage
            }),
        })
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }
}
