//! Provenance classification
//!
//! Decides which `source` tag a flashcard carries. This is the only place
//! that interprets edit evidence; the approval and update flows call in here
//! rather than checking flags themselves. All functions are total.

use crate::db::models::FlashcardSource;
use crate::flashcards::types::FlashcardCandidate;

/// Whether the reviewer changed a candidate before approving it.
///
/// True when any of these hold:
/// 1. the candidate-level `wasEdited` flag is set
/// 2. the metadata `wasEdited` flag is set
/// 3. the metadata `modified` flag is set
/// 4. the metadata carries a non-empty `edited_at`
/// 5. a non-empty side of `original_content` differs from the current text
pub fn classify_is_edited(candidate: &FlashcardCandidate) -> bool {
    let edit = &candidate.ai_metadata.edit;

    if candidate.was_edited == Some(true) {
        return true;
    }
    if edit.was_edited == Some(true) {
        return true;
    }
    if edit.modified == Some(true) {
        return true;
    }
    if edit.edited_at.as_deref().is_some_and(|at| !at.is_empty()) {
        return true;
    }

    match &edit.original_content {
        Some(original) => {
            differs(original.front_content.as_deref(), &candidate.front_content)
                || differs(original.back_content.as_deref(), &candidate.back_content)
        }
        None => false,
    }
}

// An absent or empty snapshot side is no evidence either way.
fn differs(original: Option<&str>, current: &str) -> bool {
    matches!(original, Some(text) if !text.is_empty() && text != current)
}

/// Source tag for a candidate being approved. Never `manual`.
pub fn resolve_source_for_approval(candidate: &FlashcardCandidate) -> FlashcardSource {
    if classify_is_edited(candidate) {
        FlashcardSource::SemiAi
    } else {
        FlashcardSource::Ai
    }
}

/// Source tag after a direct update.
///
/// Only an `ai` card whose content changed moves (to `semi_ai`); `manual`
/// and `semi_ai` are terminal.
pub fn resolve_source_for_update(existing: FlashcardSource, content_changed: bool) -> FlashcardSource {
    match existing {
        FlashcardSource::Ai if content_changed => FlashcardSource::SemiAi,
        other => other,
    }
}
