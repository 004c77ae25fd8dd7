//! Candidate generation
//!
//! Validates the request, calls the AI gateway under a timeout and a
//! cancellation token, and turns its output into reviewable candidates.
//! Nothing is persisted here.

use crate::ai::{parse_flashcards, prompt, CompletionRequest, TextGenerator};
use crate::config::AiConfig;
use crate::errors::{AppError, Result};
use crate::flashcards::types::{
    AiMetadata, EditEvidence, FlashcardCandidate, GenerateFlashcardsRequest,
};
use crate::metrics;
use serde_json::{json, Map};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use validator::Validate;

/// Cards requested when the caller does not say
pub const DEFAULT_MAX_FLASHCARDS: u32 = 10;

/// Orchestrates one generation round-trip
pub struct GenerationService {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl GenerationService {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &AiConfig) -> Self {
        Self {
            generator,
            timeout: config.timeout(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Override the call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Produce candidates for `request`.
    ///
    /// Cancelling `cancel` drops the in-flight gateway call.
    pub async fn generate(
        &self,
        request: &GenerateFlashcardsRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<FlashcardCandidate>> {
        request.validate()?;

        let max_flashcards = request
            .options
            .max_flashcards
            .unwrap_or(DEFAULT_MAX_FLASHCARDS);

        let completion_request = CompletionRequest {
            model: None,
            system: prompt::system_prompt(),
            user: prompt::user_prompt(&request.source_text, max_flashcards),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::info!(
            source_chars = request.source_text.chars().count(),
            max_flashcards,
            model = %self.generator.model_name(),
            "Generating flashcard candidates"
        );

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::GenerationCancelled),
            result = tokio::time::timeout(self.timeout, self.generator.complete(&completion_request)) => {
                result.unwrap_or(Err(AppError::GenerationTimeout {
                    timeout_secs: self.timeout.as_secs(),
                }))
            }
        };
        let elapsed = started.elapsed();

        let candidates = outcome.and_then(|completion| {
            let cards = parse_flashcards(&completion.content, max_flashcards as usize)?;
            let metadata = AiMetadata {
                model: completion.model,
                generation_time: format!("{}ms", elapsed.as_millis()),
                parameters: self.parameters(max_flashcards),
                edit: EditEvidence::default(),
            };

            Ok(cards
                .into_iter()
                .map(|card| FlashcardCandidate {
                    front_content: card.front,
                    back_content: card.back,
                    ai_metadata: metadata.clone(),
                    was_edited: None,
                })
                .collect::<Vec<_>>())
        });

        let model = self.generator.model_name();
        match &candidates {
            Ok(list) => {
                metrics::record_generation(elapsed.as_secs_f64(), model, None);
                tracing::info!(
                    count = list.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Flashcard candidates generated"
                );
            }
            Err(e) => {
                metrics::record_generation(elapsed.as_secs_f64(), model, Some(e.code().as_str()));
                tracing::warn!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Generation failed");
            }
        }

        candidates
    }

    fn parameters(&self, max_flashcards: u32) -> Map<String, serde_json::Value> {
        let mut parameters = Map::new();
        parameters.insert("max_flashcards".to_string(), json!(max_flashcards));
        parameters.insert(
            "model_parameters".to_string(),
            json!({ "temperature": self.temperature, "max_tokens": self.max_tokens }),
        );
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockGenerator;

    const FIXED: &str = r#"```json
{"flashcards": [
  {"front": "Q1", "back": "A1"},
  {"front": "Q2", "back": "A2"},
  {"front": "Q3", "back": "A3"}
]}
```"#;

    fn request(chars: usize, max: Option<u32>) -> GenerateFlashcardsRequest {
        let sentence = "Cells are the basic unit of life. ";
        let text: String = sentence.chars().cycle().take(chars).collect();
        GenerateFlashcardsRequest {
            source_text: text,
            options: crate::flashcards::types::GenerationOptions {
                max_flashcards: max,
            },
        }
    }

    fn service(mock: Arc<MockGenerator>) -> GenerationService {
        GenerationService::new(mock, &AiConfig::default())
    }

    fn fields(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation { fields, .. } => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_source_text_bounds() {
        let mock = Arc::new(MockGenerator::new().with_response(FIXED));
        let svc = service(mock.clone());
        let token = CancellationToken::new();

        let err = svc.generate(&request(999, None), &token).await.unwrap_err();
        assert_eq!(fields(err), ["source_text"]);
        let err = svc.generate(&request(10001, None), &token).await.unwrap_err();
        assert_eq!(fields(err), ["source_text"]);
        assert_eq!(mock.calls(), 0);

        assert!(svc.generate(&request(1000, None), &token).await.is_ok());
        assert!(svc.generate(&request(10000, None), &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_max_flashcards_bounds() {
        let mock = Arc::new(MockGenerator::new().with_response(FIXED));
        let svc = service(mock.clone());
        let token = CancellationToken::new();

        for bad in [0, 31] {
            let err = svc.generate(&request(1200, Some(bad)), &token).await.unwrap_err();
            assert_eq!(fields(err), ["options.max_flashcards"]);
        }
        assert_eq!(mock.calls(), 0);

        let one = svc.generate(&request(1200, Some(1)), &token).await.unwrap();
        assert_eq!(one.len(), 1);
        assert!(svc.generate(&request(1200, Some(30)), &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_candidates_carry_metadata() {
        let mock = Arc::new(MockGenerator::new().with_response(FIXED));
        let candidates = service(mock)
            .generate(&request(1000, None), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 3);
        let metadata = &candidates[0].ai_metadata;
        assert_eq!(metadata.model, crate::ai::MockGenerator::new().model_name());
        assert!(metadata.generation_time.ends_with("ms"));
        assert_eq!(metadata.parameters["max_flashcards"], json!(DEFAULT_MAX_FLASHCARDS));
        assert_eq!(metadata.edit, EditEvidence::default());
    }

    #[tokio::test]
    async fn test_malformed_output_is_parse_error() {
        let mock = Arc::new(MockGenerator::new().with_response(r#"{"cards": []}"#));
        let err = service(mock)
            .generate(&request(1000, None), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationParse { .. }));
    }

    #[tokio::test]
    async fn test_service_failure_is_not_retried() {
        let mock = Arc::new(MockGenerator::new().failing("API key is invalid or expired"));
        let err = service(mock.clone())
            .generate(&request(1000, None), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GenerationService { .. }));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let mock = Arc::new(MockGenerator::new().with_delay(Duration::from_secs(5)));
        let err = service(mock.clone())
            .with_timeout(Duration::from_millis(50))
            .generate(&request(1000, None), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GenerationTimeout { .. }));
        assert!(err.is_retryable());
        assert_eq!(mock.completed(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_call() {
        let mock = Arc::new(MockGenerator::new().with_delay(Duration::from_millis(200)));
        let svc = service(mock.clone());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = svc.generate(&request(1000, None), &token).await.unwrap_err();
        assert!(matches!(err, AppError::GenerationCancelled));

        // the dropped call never finishes
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.completed(), 0);
    }
}
