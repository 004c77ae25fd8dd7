//! In-process record store
//!
//! Backs `database.url = "memory://"` for local development and serves as
//! the store in unit tests. Semantics match the Postgres repository: owner
//! scoping, independent totals, ordering with an id tie-break.

use crate::db::models::{Flashcard, SystemLog};
use crate::db::store::{
    FlashcardChanges, FlashcardStore, ListPage, ListQuery, NewFlashcard, NewSystemLog,
    SortField, SortOrder, SystemLogSink,
};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    cards: RwLock<Vec<Flashcard>>,
    logs: RwLock<Vec<SystemLog>>,
    insert_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert_many` calls made so far
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Every stored card regardless of owner
    pub async fn all(&self) -> Vec<Flashcard> {
        self.cards.read().await.clone()
    }

    /// Recorded failure rows, oldest first
    pub async fn system_logs(&self) -> Vec<SystemLog> {
        self.logs.read().await.clone()
    }
}

#[async_trait]
impl FlashcardStore for InMemoryStore {
    async fn insert_many(&self, records: Vec<NewFlashcard>) -> Result<Vec<Flashcard>> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        let now = chrono::Utc::now().fixed_offset();
        let inserted: Vec<Flashcard> = records
            .into_iter()
            .map(|record| Flashcard {
                id: Uuid::new_v4(),
                user_id: record.user_id,
                front_content: record.front_content,
                back_content: record.back_content,
                source: record.source,
                ai_metadata: record.ai_metadata,
                created_at: now,
                updated_at: now,
            })
            .collect();

        self.cards.write().await.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn get_by_id(&self, owner: Uuid, id: Uuid) -> Result<Flashcard> {
        self.cards
            .read()
            .await
            .iter()
            .find(|c| c.id == id && c.user_id == owner)
            .cloned()
            .ok_or_else(|| AppError::flashcard_not_found(id))
    }

    async fn update(&self, owner: Uuid, id: Uuid, changes: FlashcardChanges) -> Result<Flashcard> {
        let mut cards = self.cards.write().await;
        let card = cards
            .iter_mut()
            .find(|c| c.id == id && c.user_id == owner)
            .ok_or_else(|| AppError::flashcard_not_found(id))?;

        if let Some(front) = changes.front_content {
            card.front_content = front;
        }
        if let Some(back) = changes.back_content {
            card.back_content = back;
        }
        if let Some(metadata) = changes.ai_metadata {
            card.ai_metadata = Some(metadata);
        }
        card.source = changes.source;
        card.updated_at = changes.updated_at.fixed_offset();

        Ok(card.clone())
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()> {
        let mut cards = self.cards.write().await;
        let before = cards.len();
        cards.retain(|c| !(c.id == id && c.user_id == owner));

        if cards.len() == before {
            return Err(AppError::flashcard_not_found(id));
        }
        Ok(())
    }

    async fn list(&self, owner: Uuid, query: &ListQuery) -> Result<ListPage> {
        let cards = self.cards.read().await;
        let mut matching: Vec<Flashcard> = cards
            .iter()
            .filter(|c| c.user_id == owner)
            .filter(|c| query.source.map_or(true, |s| c.source == s))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let (ka, kb) = match query.sort {
                SortField::CreatedAt => (a.created_at, b.created_at),
                SortField::UpdatedAt => (a.updated_at, b.updated_at),
            };
            let ordered = match query.order {
                SortOrder::Asc => ka.cmp(&kb),
                SortOrder::Desc => kb.cmp(&ka),
            };
            ordered.then_with(|| a.id.cmp(&b.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .collect();

        Ok(ListPage { items, total })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SystemLogSink for InMemoryStore {
    async fn record(&self, entry: NewSystemLog) -> Result<()> {
        self.logs.write().await.push(SystemLog {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            error_code: entry.error_code,
            error_message: entry.error_message,
            model: entry.model,
            created_at: chrono::Utc::now().fixed_offset(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::FlashcardSource;

    fn new_card(owner: Uuid, front: &str) -> NewFlashcard {
        NewFlashcard {
            user_id: owner,
            front_content: front.to_string(),
            back_content: "back".to_string(),
            source: FlashcardSource::Manual,
            ai_metadata: None,
        }
    }

    fn query(page: u64, limit: u64) -> ListQuery {
        ListQuery {
            page,
            limit,
            sort: SortField::CreatedAt,
            order: SortOrder::Asc,
            source: None,
        }
    }

    #[tokio::test]
    async fn test_cross_owner_reads_are_not_found() {
        let store = InMemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let card = store.insert_many(vec![new_card(alice, "q")]).await.unwrap().remove(0);

        assert!(store.get_by_id(alice, card.id).await.is_ok());
        let err = store.get_by_id(bob, card.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        let err = store.delete(bob, card.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_total_is_independent_of_page() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let records = (0..5).map(|i| new_card(owner, &format!("q{}", i))).collect();
        store.insert_many(records).await.unwrap();
        store.insert_many(vec![new_card(Uuid::new_v4(), "other")]).await.unwrap();

        let page = store.list(owner, &query(3, 2)).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 1);

        let page = store.list(owner, &query(9, 2)).await.unwrap();
        assert_eq!(page.total, 5);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_source_filter() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let mut ai = new_card(owner, "ai");
        ai.source = FlashcardSource::Ai;
        store.insert_many(vec![ai, new_card(owner, "manual")]).await.unwrap();

        let mut q = query(1, 10);
        q.source = Some(FlashcardSource::Ai);
        let page = store.list(owner, &q).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].front_content, "ai");
    }
}
