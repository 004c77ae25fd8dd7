//! Approval workflow
//!
//! Tags each reviewed candidate with its provenance and persists the batch
//! in fixed-size chunks, one chunk at a time.
//!
//! A failed chunk aborts the operation, but chunks already written stay
//! written. Callers that see a `Persistence` error should re-query the list
//! to reconcile.

use crate::db::models::{Flashcard, FlashcardSource};
use crate::db::{FlashcardStore, NewFlashcard};
use crate::errors::{AppError, Result};
use crate::flashcards::provenance::resolve_source_for_approval;
use crate::flashcards::types::ApproveFlashcardsRequest;
use crate::metrics;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Records per store call
pub const CHUNK_SIZE: usize = 50;

/// Result of a fully persisted batch
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub approved: Vec<Flashcard>,
    pub count: usize,
}

pub struct ApprovalService {
    store: Arc<dyn FlashcardStore>,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn FlashcardStore>) -> Self {
        Self { store }
    }

    /// Persist every candidate in `request` for `owner`
    pub async fn approve(&self, owner: Uuid, request: ApproveFlashcardsRequest) -> Result<ApprovalOutcome> {
        request.validate()?;

        if request.flashcards.is_empty() {
            return Ok(ApprovalOutcome {
                approved: Vec::new(),
                count: 0,
            });
        }

        let mut records = Vec::with_capacity(request.flashcards.len());
        for candidate in request.flashcards {
            let source = resolve_source_for_approval(&candidate);
            records.push(NewFlashcard {
                user_id: owner,
                source,
                ai_metadata: Some(serde_json::to_value(&candidate.ai_metadata)?),
                front_content: candidate.front_content,
                back_content: candidate.back_content,
            });
        }

        let total_chunks = records.len().div_ceil(CHUNK_SIZE);
        let mut approved = Vec::with_capacity(records.len());

        for (index, chunk) in records.chunks(CHUNK_SIZE).enumerate() {
            let chunk_number = index + 1;

            let inserted = self
                .store
                .insert_many(chunk.to_vec())
                .await
                .map_err(|e| {
                    tracing::error!(
                        owner = %owner,
                        chunk = chunk_number,
                        total_chunks,
                        persisted = approved.len(),
                        error = %e,
                        "Failed to save flashcards batch"
                    );
                    AppError::Persistence {
                        chunk: chunk_number,
                        total_chunks,
                        message: e.to_string(),
                    }
                })?;

            tracing::debug!(chunk = chunk_number, total_chunks, rows = inserted.len(), "Chunk persisted");
            approved.extend(inserted);
        }

        for source in [FlashcardSource::Ai, FlashcardSource::SemiAi] {
            let n = approved.iter().filter(|card| card.source == source).count();
            if n > 0 {
                metrics::record_approved(source.as_str(), n);
            }
        }

        tracing::info!(owner = %owner, count = approved.len(), total_chunks, "Flashcards approved");

        let count = approved.len();
        Ok(ApprovalOutcome { approved, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FlashcardChanges, InMemoryStore, ListPage, ListQuery};
    use crate::flashcards::types::{AiMetadata, EditEvidence, FlashcardCandidate, OriginalContent};
    use async_trait::async_trait;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store wrapper that fails the n-th insert call
    struct FailingStore {
        inner: InMemoryStore,
        fail_on_call: usize,
        calls: AtomicUsize,
        chunk_sizes: std::sync::Mutex<Vec<usize>>,
    }

    impl FailingStore {
        fn new(fail_on_call: usize) -> Self {
            Self {
                inner: InMemoryStore::new(),
                fail_on_call,
                calls: AtomicUsize::new(0),
                chunk_sizes: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FlashcardStore for FailingStore {
        async fn insert_many(&self, records: Vec<NewFlashcard>) -> Result<Vec<Flashcard>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.chunk_sizes.lock().unwrap().push(records.len());
            if call == self.fail_on_call {
                return Err(AppError::Internal {
                    message: "connection reset".to_string(),
                });
            }
            self.inner.insert_many(records).await
        }

        async fn get_by_id(&self, owner: Uuid, id: Uuid) -> Result<Flashcard> {
            self.inner.get_by_id(owner, id).await
        }

        async fn update(&self, owner: Uuid, id: Uuid, changes: FlashcardChanges) -> Result<Flashcard> {
            self.inner.update(owner, id, changes).await
        }

        async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()> {
            self.inner.delete(owner, id).await
        }

        async fn list(&self, owner: Uuid, query: &ListQuery) -> Result<ListPage> {
            self.inner.list(owner, query).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn candidate(i: usize) -> FlashcardCandidate {
        FlashcardCandidate {
            front_content: format!("Question {}", i),
            back_content: format!("Answer {}", i),
            ai_metadata: AiMetadata {
                model: "anthropic/claude-3-haiku".to_string(),
                generation_time: "1200ms".to_string(),
                parameters: Map::new(),
                edit: EditEvidence::default(),
            },
            was_edited: None,
        }
    }

    fn batch(n: usize) -> ApproveFlashcardsRequest {
        ApproveFlashcardsRequest {
            flashcards: (0..n).map(candidate).collect(),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_store() {
        let store = Arc::new(InMemoryStore::new());
        let outcome = ApprovalService::new(store.clone())
            .approve(Uuid::new_v4(), batch(0))
            .await
            .unwrap();

        assert_eq!(outcome.count, 0);
        assert!(outcome.approved.is_empty());
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_chunks_of_fifty() {
        let store = Arc::new(FailingStore::new(usize::MAX));
        let owner = Uuid::new_v4();
        let outcome = ApprovalService::new(store.clone())
            .approve(owner, batch(120))
            .await
            .unwrap();

        assert_eq!(outcome.count, 120);
        assert_eq!(*store.chunk_sizes.lock().unwrap(), vec![50, 50, 20]);
        assert!(outcome.approved.iter().all(|c| c.user_id == owner));
        assert_eq!(outcome.approved[119].front_content, "Question 119");
    }

    #[tokio::test]
    async fn test_failed_chunk_is_named_and_earlier_rows_stay() {
        let store = Arc::new(FailingStore::new(2));
        let err = ApprovalService::new(store.clone())
            .approve(Uuid::new_v4(), batch(120))
            .await
            .unwrap_err();

        match err {
            AppError::Persistence { chunk, total_chunks, .. } => {
                assert_eq!(chunk, 2);
                assert_eq!(total_chunks, 3);
            }
            other => panic!("expected persistence error, got {other:?}"),
        }

        // chunk 3 never attempted, chunk 1 not rolled back
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.inner.all().await.len(), 50);
    }

    #[tokio::test]
    async fn test_sources_follow_edit_evidence() {
        let store = Arc::new(InMemoryStore::new());
        let mut request = batch(3);
        request.flashcards[1].front_content = "Edited question".to_string();
        request.flashcards[1].ai_metadata.edit.original_content = Some(OriginalContent {
            front_content: Some("Question 1".to_string()),
            back_content: Some("Answer 1".to_string()),
        });
        request.flashcards[2].was_edited = Some(true);

        let outcome = ApprovalService::new(store)
            .approve(Uuid::new_v4(), request)
            .await
            .unwrap();

        let sources: Vec<_> = outcome.approved.iter().map(|c| c.source).collect();
        assert_eq!(
            sources,
            vec![FlashcardSource::Ai, FlashcardSource::SemiAi, FlashcardSource::SemiAi]
        );

        let metadata = outcome.approved[0].ai_metadata.as_ref().unwrap();
        assert_eq!(metadata["model"], "anthropic/claude-3-haiku");
    }

    #[tokio::test]
    async fn test_invalid_candidate_rejected_before_store() {
        let store = Arc::new(InMemoryStore::new());
        let mut request = batch(3);
        request.flashcards[2].front_content = String::new();

        let err = ApprovalService::new(store.clone())
            .approve(Uuid::new_v4(), request)
            .await
            .unwrap_err();

        assert_eq!(err.fields(), ["flashcards[2].front_content".to_string()]);
        assert_eq!(store.insert_calls(), 0);
    }
}
