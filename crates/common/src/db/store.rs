//! Record store contract
//!
//! The narrow set of operations the flashcard workflows need from storage.
//! Every method is scoped by owner: a record that exists but belongs to
//! someone else is reported exactly like a missing one.

use crate::db::models::{Flashcard, FlashcardSource};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Insert payload; id and timestamps are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewFlashcard {
    pub user_id: Uuid,
    pub front_content: String,
    pub back_content: String,
    pub source: FlashcardSource,
    pub ai_metadata: Option<Json>,
}

/// Field changes applied by `update`. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashcardChanges {
    pub front_content: Option<String>,
    pub back_content: Option<String>,
    pub source: FlashcardSource,
    pub ai_metadata: Option<Json>,
    pub updated_at: DateTime<Utc>,
}

/// Column used for ordering list results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// A resolved, bounds-checked list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub limit: u64,
    pub sort: SortField,
    pub order: SortOrder,
    pub source: Option<FlashcardSource>,
}

/// Largest OFFSET the database accepts (a signed 64-bit bind parameter)
pub const MAX_OFFSET: u64 = i64::MAX as u64;

impl ListQuery {
    /// Rows to skip before the requested page, capped at `MAX_OFFSET`
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(MAX_OFFSET)
    }
}

/// One page of rows plus the total matching the filter
#[derive(Debug, Clone)]
pub struct ListPage {
    pub items: Vec<Flashcard>,
    pub total: u64,
}

/// Storage operations for flashcards
#[async_trait]
pub trait FlashcardStore: Send + Sync {
    /// Insert all records atomically, returning them with ids and timestamps
    async fn insert_many(&self, records: Vec<NewFlashcard>) -> Result<Vec<Flashcard>>;

    /// Fetch one record owned by `owner`
    async fn get_by_id(&self, owner: Uuid, id: Uuid) -> Result<Flashcard>;

    /// Apply `changes` to a record owned by `owner`
    async fn update(&self, owner: Uuid, id: Uuid, changes: FlashcardChanges) -> Result<Flashcard>;

    /// Remove a record owned by `owner`
    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()>;

    /// One page of `owner`'s records plus the independent total count
    async fn list(&self, owner: Uuid, query: &ListQuery) -> Result<ListPage>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> Result<()>;
}

/// A failed operation worth keeping a record of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSystemLog {
    pub user_id: Option<Uuid>,
    pub error_code: String,
    pub error_message: String,
    pub model: Option<String>,
}

/// Destination for failure records
#[async_trait]
pub trait SystemLogSink: Send + Sync {
    async fn record(&self, entry: NewSystemLog) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: u64, limit: u64) -> ListQuery {
        ListQuery {
            page,
            limit,
            sort: SortField::default(),
            order: SortOrder::default(),
            source: None,
        }
    }

    #[test]
    fn test_offset() {
        assert_eq!(query(1, 20).offset(), 0);
        assert_eq!(query(3, 20).offset(), 40);
        assert_eq!(query(5, 100).offset(), 400);
    }

    #[test]
    fn test_offset_fits_signed_bind() {
        assert_eq!(query(u64::MAX / 50, 100).offset(), MAX_OFFSET);
        assert_eq!(query(u64::MAX, 1).offset(), MAX_OFFSET);
        assert!(i64::try_from(query(368_934_881_474_191_032, 100).offset()).is_ok());
    }

    #[test]
    fn test_sort_defaults() {
        assert_eq!(SortField::default(), SortField::CreatedAt);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }
}
