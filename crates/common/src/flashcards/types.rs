//! Flashcard request/response types and candidate metadata

use crate::db::models::{Flashcard, FlashcardSource};
use crate::db::{SortField, SortOrder};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

/// Longest allowed flashcard side, in characters
pub const MAX_CONTENT_CHARS: u64 = 200;

/// Front/back text as the model first proposed it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_content: Option<String>,
}

/// Everything a reviewer's client may report about edits to a candidate.
///
/// Only the provenance classifier interprets these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEvidence {
    #[serde(rename = "wasEdited", default, skip_serializing_if = "Option::is_none")]
    pub was_edited: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<OriginalContent>,
}

/// Generation metadata attached to every candidate and persisted with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AiMetadata {
    /// Model that produced the candidate
    #[validate(length(min = 1))]
    pub model: String,

    /// Wall-clock generation time, e.g. "1840ms"
    #[serde(default)]
    pub generation_time: String,

    /// Parameters the generation ran with
    #[serde(default)]
    pub parameters: Map<String, Value>,

    #[serde(flatten)]
    pub edit: EditEvidence,
}

/// An AI-proposed flashcard awaiting review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FlashcardCandidate {
    #[validate(length(min = 1, max = 200))]
    pub front_content: String,

    #[validate(length(min = 1, max = 200))]
    pub back_content: String,

    #[validate(nested)]
    pub ai_metadata: AiMetadata,

    /// Edit flag some clients set on the candidate itself
    #[serde(rename = "wasEdited", default, skip_serializing_if = "Option::is_none")]
    pub was_edited: Option<bool>,
}

/// Options accepted by the generate operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GenerationOptions {
    #[validate(range(min = 1, max = 30))]
    pub max_flashcards: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GenerateFlashcardsRequest {
    #[validate(length(min = 1000, max = 10000))]
    pub source_text: String,

    #[serde(default)]
    #[validate(nested)]
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateFlashcardsResponse {
    pub flashcards_proposals: Vec<FlashcardCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApproveFlashcardsRequest {
    #[validate(nested)]
    pub flashcards: Vec<FlashcardCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveFlashcardsResponse {
    pub approved: Vec<FlashcardView>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFlashcardRequest {
    #[validate(length(min = 1, max = 200))]
    pub front_content: String,

    #[validate(length(min = 1, max = 200))]
    pub back_content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFlashcardRequest {
    #[validate(length(min = 1, max = 200))]
    pub front_content: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub back_content: Option<String>,

    /// Replaces the stored metadata when present
    pub ai_metadata: Option<Value>,
}

/// Raw list query parameters, before defaults and bounds are applied
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFlashcardsParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
    pub source: Option<FlashcardSource>,
}

/// Flashcard as returned to its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardView {
    pub id: Uuid,
    pub front_content: String,
    pub back_content: String,
    pub source: FlashcardSource,
    pub ai_metadata: Option<Value>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<Flashcard> for FlashcardView {
    fn from(card: Flashcard) -> Self {
        Self {
            id: card.id,
            front_content: card.front_content,
            back_content: card.back_content,
            source: card.source,
            ai_metadata: card.ai_metadata,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
