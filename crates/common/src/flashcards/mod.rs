//! Flashcard workflows
//!
//! - `provenance`: source tagging from edit evidence
//! - `generation`: AI candidate generation
//! - `approval`: chunked persistence of reviewed candidates
//! - `service`: manual create, get, update, delete, list
//! - `pagination`: list query bounds and page envelopes

pub mod approval;
pub mod generation;
pub mod pagination;
pub mod provenance;
pub mod service;
pub mod types;

pub use approval::{ApprovalOutcome, ApprovalService, CHUNK_SIZE};
pub use generation::{GenerationService, DEFAULT_MAX_FLASHCARDS};
pub use provenance::{classify_is_edited, resolve_source_for_approval, resolve_source_for_update};
pub use service::FlashcardService;
pub use types::*;
