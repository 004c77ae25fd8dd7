//! Flashcard entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provenance tag persisted with every flashcard
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "flashcard_source")]
#[serde(rename_all = "snake_case")]
pub enum FlashcardSource {
    /// Typed in by the user
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Approved exactly as the model proposed it
    #[sea_orm(string_value = "ai")]
    Ai,
    /// Model proposal that the user edited
    #[sea_orm(string_value = "semi_ai")]
    SemiAi,
}

impl FlashcardSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashcardSource::Manual => "manual",
            FlashcardSource::Ai => "ai",
            FlashcardSource::SemiAi => "semi_ai",
        }
    }
}

impl std::fmt::Display for FlashcardSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flashcards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub front_content: String,

    #[sea_orm(column_type = "Text")]
    pub back_content: String,

    pub source: FlashcardSource,

    /// Generation metadata and edit evidence, as JSONB
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub ai_metadata: Option<Json>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
