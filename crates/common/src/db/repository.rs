//! Repository pattern for database operations
//!
//! SeaORM-backed implementation of the record store. All flashcard queries
//! carry the owner filter so callers cannot forget it.

use crate::db::models::*;
use crate::db::store::{
    FlashcardChanges, FlashcardStore, ListPage, ListQuery, NewFlashcard, NewSystemLog,
    SortField, SortOrder, SystemLogSink,
};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Insert, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, UpdateMany,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }

    /// Base select restricted to one owner
    fn owned(owner: Uuid) -> Select<FlashcardEntity> {
        FlashcardEntity::find().filter(FlashcardColumn::UserId.eq(owner))
    }

    fn filtered(owner: Uuid, query: &ListQuery) -> Select<FlashcardEntity> {
        let select = Self::owned(owner);
        match query.source {
            Some(source) => select.filter(FlashcardColumn::Source.eq(source)),
            None => select,
        }
    }

    async fn find_owned(&self, owner: Uuid, id: Uuid) -> Result<Flashcard> {
        Self::owned(owner)
            .filter(FlashcardColumn::Id.eq(id))
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::flashcard_not_found(id))
    }

    /// One multi-row INSERT for a whole chunk
    fn insert_rows(records: Vec<NewFlashcard>, now: DateTime<Utc>) -> Insert<FlashcardActiveModel> {
        FlashcardEntity::insert_many(records.into_iter().map(|record| FlashcardActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(record.user_id),
            front_content: Set(record.front_content),
            back_content: Set(record.back_content),
            source: Set(record.source),
            ai_metadata: Set(record.ai_metadata),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }))
    }

    /// UPDATE carrying both the id and the owner filter
    fn owned_update(owner: Uuid, id: Uuid, changes: FlashcardChanges) -> UpdateMany<FlashcardEntity> {
        let mut card = FlashcardActiveModel {
            source: Set(changes.source),
            updated_at: Set(changes.updated_at.into()),
            ..Default::default()
        };
        if let Some(front) = changes.front_content {
            card.front_content = Set(front);
        }
        if let Some(back) = changes.back_content {
            card.back_content = Set(back);
        }
        if let Some(metadata) = changes.ai_metadata {
            card.ai_metadata = Set(Some(metadata));
        }

        FlashcardEntity::update_many()
            .set(card)
            .filter(FlashcardColumn::Id.eq(id))
            .filter(FlashcardColumn::UserId.eq(owner))
    }
}

#[async_trait]
impl FlashcardStore for Repository {
    async fn insert_many(&self, records: Vec<NewFlashcard>) -> Result<Vec<Flashcard>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let inserted = Self::insert_rows(records, Utc::now())
            .exec_with_returning_many(self.conn())
            .await?;
        Ok(inserted)
    }

    async fn get_by_id(&self, owner: Uuid, id: Uuid) -> Result<Flashcard> {
        self.find_owned(owner, id).await
    }

    async fn update(&self, owner: Uuid, id: Uuid, changes: FlashcardChanges) -> Result<Flashcard> {
        // Zero rows back covers both a foreign id and a concurrent delete
        Self::owned_update(owner, id, changes)
            .exec_with_returning(self.conn())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::flashcard_not_found(id))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()> {
        let result = FlashcardEntity::delete_many()
            .filter(FlashcardColumn::Id.eq(id))
            .filter(FlashcardColumn::UserId.eq(owner))
            .exec(self.conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::flashcard_not_found(id));
        }
        Ok(())
    }

    async fn list(&self, owner: Uuid, query: &ListQuery) -> Result<ListPage> {
        let column = match query.sort {
            SortField::CreatedAt => FlashcardColumn::CreatedAt,
            SortField::UpdatedAt => FlashcardColumn::UpdatedAt,
        };
        let order = match query.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        // Count is its own query so the total stays right on partial pages
        let total = Self::filtered(owner, query).count(self.conn()).await?;

        let items = Self::filtered(owner, query)
            .order_by(column, order)
            .order_by_asc(FlashcardColumn::Id)
            .offset(query.offset())
            .limit(query.limit)
            .all(self.conn())
            .await?;

        Ok(ListPage { items, total })
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[async_trait]
impl SystemLogSink for Repository {
    async fn record(&self, entry: NewSystemLog) -> Result<()> {
        let row = SystemLogActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(entry.user_id),
            error_code: Set(entry.error_code),
            error_message: Set(entry.error_message),
            model: Set(entry.model),
            created_at: Set(Utc::now().into()),
        };

        row.insert(self.conn()).await?;
        Ok(())
    }
}
