//! Single-record flows: manual create, get, update, delete, list

use crate::db::models::{Flashcard, FlashcardSource};
use crate::db::{FlashcardChanges, FlashcardStore, NewFlashcard};
use crate::errors::{AppError, Result};
use crate::flashcards::pagination::{paginate, resolve_list_query};
use crate::flashcards::provenance::resolve_source_for_update;
use crate::flashcards::types::{
    CreateFlashcardRequest, FlashcardView, ListFlashcardsParams, PaginatedResponse,
    UpdateFlashcardRequest,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct FlashcardService {
    store: Arc<dyn FlashcardStore>,
}

impl FlashcardService {
    pub fn new(store: Arc<dyn FlashcardStore>) -> Self {
        Self { store }
    }

    /// Create a hand-written card, tagged `manual`
    pub async fn create_manual(&self, owner: Uuid, request: CreateFlashcardRequest) -> Result<Flashcard> {
        request.validate()?;

        let card = self
            .store
            .insert_many(vec![NewFlashcard {
                user_id: owner,
                front_content: request.front_content,
                back_content: request.back_content,
                source: FlashcardSource::Manual,
                ai_metadata: None,
            }])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal {
                message: "store returned no row for a single insert".to_string(),
            })?;

        tracing::info!(owner = %owner, id = %card.id, "Manual flashcard created");
        Ok(card)
    }

    pub async fn get(&self, owner: Uuid, id: Uuid) -> Result<Flashcard> {
        self.store.get_by_id(owner, id).await
    }

    /// Apply an edit. An `ai` card whose text changes becomes `semi_ai`.
    pub async fn update(&self, owner: Uuid, id: Uuid, request: UpdateFlashcardRequest) -> Result<Flashcard> {
        request.validate()?;

        if request.front_content.is_none()
            && request.back_content.is_none()
            && request.ai_metadata.is_none()
        {
            return Err(AppError::Validation {
                message: "at least one of front_content, back_content or ai_metadata is required"
                    .to_string(),
                fields: Vec::new(),
            });
        }

        let existing = self.store.get_by_id(owner, id).await?;

        let content_changed = request
            .front_content
            .as_ref()
            .is_some_and(|front| *front != existing.front_content)
            || request
                .back_content
                .as_ref()
                .is_some_and(|back| *back != existing.back_content);

        let source = resolve_source_for_update(existing.source, content_changed);
        if source != existing.source {
            tracing::info!(
                id = %id,
                from = %existing.source,
                to = %source,
                "Flashcard provenance changed by edit"
            );
        }

        let updated = self
            .store
            .update(
                owner,
                id,
                FlashcardChanges {
                    front_content: request.front_content,
                    back_content: request.back_content,
                    source,
                    ai_metadata: request.ai_metadata,
                    updated_at: chrono::Utc::now(),
                },
            )
            .await?;

        tracing::debug!(id = %id, content_changed, "Flashcard updated");
        Ok(updated)
    }

    pub async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()> {
        self.store.delete(owner, id).await?;
        tracing::info!(owner = %owner, id = %id, "Flashcard deleted");
        Ok(())
    }

    pub async fn list(&self, owner: Uuid, params: ListFlashcardsParams) -> Result<PaginatedResponse<FlashcardView>> {
        let query = resolve_list_query(params)?;
        let page = self.store.list(owner, &query).await?;
        Ok(paginate(page, &query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockGenerator;
    use crate::config::AiConfig;
    use crate::db::InMemoryStore;
    use crate::flashcards::approval::ApprovalService;
    use crate::flashcards::generation::GenerationService;
    use crate::flashcards::types::{
        ApproveFlashcardsRequest, GenerateFlashcardsRequest, GenerationOptions, OriginalContent,
    };
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn manual(front: &str, back: &str) -> CreateFlashcardRequest {
        CreateFlashcardRequest {
            front_content: front.to_string(),
            back_content: back.to_string(),
        }
    }

    fn edit(front: Option<&str>, back: Option<&str>) -> UpdateFlashcardRequest {
        UpdateFlashcardRequest {
            front_content: front.map(str::to_string),
            back_content: back.map(str::to_string),
            ai_metadata: None,
        }
    }

    async fn generate_three() -> Vec<crate::flashcards::types::FlashcardCandidate> {
        let mock = Arc::new(MockGenerator::new().with_response(
            r#"{"flashcards": [
                {"front": "What is mitosis?", "back": "Cell division"},
                {"front": "What is meiosis?", "back": "Division producing gametes"},
                {"front": "What is a gene?", "back": "A unit of heredity"}
            ]}"#,
        ));
        let generation = GenerationService::new(mock, &AiConfig::default());
        let request = GenerateFlashcardsRequest {
            source_text: "a".repeat(1000),
            options: GenerationOptions::default(),
        };
        generation
            .generate(&request, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_then_approve_unedited_is_ai() {
        let store = Arc::new(InMemoryStore::new());
        let owner = Uuid::new_v4();
        let candidates = generate_three().await;
        assert_eq!(candidates.len(), 3);

        let outcome = ApprovalService::new(store.clone())
            .approve(owner, ApproveFlashcardsRequest { flashcards: vec![candidates[0].clone()] })
            .await
            .unwrap();

        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.approved[0].source, FlashcardSource::Ai);
    }

    #[tokio::test]
    async fn test_generate_then_approve_edited_is_semi_ai() {
        let store = Arc::new(InMemoryStore::new());
        let mut candidate = generate_three().await.remove(1);
        candidate.ai_metadata.edit.original_content = Some(OriginalContent {
            front_content: Some(candidate.front_content.clone()),
            back_content: None,
        });
        candidate.front_content = "What is meiosis, briefly?".to_string();

        let outcome = ApprovalService::new(store)
            .approve(Uuid::new_v4(), ApproveFlashcardsRequest { flashcards: vec![candidate] })
            .await
            .unwrap();

        assert_eq!(outcome.approved[0].source, FlashcardSource::SemiAi);
    }

    #[tokio::test]
    async fn test_manual_card_stays_manual() {
        let service = FlashcardService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();

        let card = service.create_manual(owner, manual("Capital of France?", "Paris")).await.unwrap();
        assert_eq!(card.source, FlashcardSource::Manual);
        assert!(card.ai_metadata.is_none());

        let updated = service
            .update(owner, card.id, edit(None, Some("Paris, on the Seine")))
            .await
            .unwrap();
        assert_eq!(updated.source, FlashcardSource::Manual);
        assert_eq!(updated.back_content, "Paris, on the Seine");
        assert_eq!(updated.front_content, "Capital of France?");
    }

    #[tokio::test]
    async fn test_ai_card_demoted_on_edit_only_once() {
        let store = Arc::new(InMemoryStore::new());
        let owner = Uuid::new_v4();
        let candidate = generate_three().await.remove(0);
        let approved = ApprovalService::new(store.clone())
            .approve(owner, ApproveFlashcardsRequest { flashcards: vec![candidate] })
            .await
            .unwrap()
            .approved
            .remove(0);
        assert_eq!(approved.source, FlashcardSource::Ai);

        let service = FlashcardService::new(store);

        // same text is not a change
        let same = service
            .update(owner, approved.id, edit(Some("What is mitosis?"), None))
            .await
            .unwrap();
        assert_eq!(same.source, FlashcardSource::Ai);

        let edited = service
            .update(owner, approved.id, edit(Some("Define mitosis"), None))
            .await
            .unwrap();
        assert_eq!(edited.source, FlashcardSource::SemiAi);

        let again = service
            .update(owner, approved.id, edit(Some("Define mitosis"), Some("Cell division")))
            .await
            .unwrap();
        assert_eq!(again.source, FlashcardSource::SemiAi);
    }

    #[tokio::test]
    async fn test_metadata_replaced_only_when_given() {
        let service = FlashcardService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();
        let card = service.create_manual(owner, manual("q", "a")).await.unwrap();

        let updated = service
            .update(
                owner,
                card.id,
                UpdateFlashcardRequest {
                    ai_metadata: Some(json!({ "note": "imported" })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.ai_metadata, Some(json!({ "note": "imported" })));

        let updated = service.update(owner, card.id, edit(Some("q2"), None)).await.unwrap();
        assert_eq!(updated.ai_metadata, Some(json!({ "note": "imported" })));
    }

    #[tokio::test]
    async fn test_update_validation() {
        let service = FlashcardService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();
        let card = service.create_manual(owner, manual("q", "a")).await.unwrap();

        let err = service.update(owner, card.id, edit(None, None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let long = "x".repeat(201);
        let err = service.update(owner, card.id, edit(Some(&long), None)).await.unwrap_err();
        assert_eq!(err.fields(), ["front_content".to_string()]);

        let err = service.create_manual(owner, manual("", "a")).await.unwrap_err();
        assert_eq!(err.fields(), ["front_content".to_string()]);
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let service = FlashcardService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let card = service.create_manual(owner, manual("q", "a")).await.unwrap();

        let missing = service.get(owner, Uuid::new_v4()).await.unwrap_err();
        let foreign = service.get(stranger, card.id).await.unwrap_err();
        assert_eq!(missing.to_string(), foreign.to_string());
        assert_eq!(missing.status_code(), foreign.status_code());

        let err = service.update(stranger, card.id, edit(Some("x"), None)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        let err = service.delete(stranger, card.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        service.delete(owner, card.id).await.unwrap();
        let err = service.get(owner, card.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let service = FlashcardService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();
        for i in 0..25 {
            service
                .create_manual(owner, manual(&format!("q{}", i), "a"))
                .await
                .unwrap();
        }

        let page = service
            .list(owner, ListFlashcardsParams { page: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.pagination.total, 25);
        assert_eq!(page.pagination.pages, 2);

        let beyond = service
            .list(owner, ListFlashcardsParams { page: Some(5), ..Default::default() })
            .await
            .unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.pagination.total, 25);
        assert_eq!(beyond.pagination.pages, 2);

        let filtered = service
            .list(
                owner,
                ListFlashcardsParams {
                    source: Some(FlashcardSource::Ai),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.pagination.total, 0);
    }
}
