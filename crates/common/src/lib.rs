//! CardForge Common Library
//!
//! Shared code for the CardForge services including:
//! - Flashcard workflows (generation, approval, provenance, queries)
//! - AI gateway client abstraction
//! - Database models and the record store
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod flashcards;
pub mod metrics;

// Re-export commonly used types
pub use ai::TextGenerator;
pub use config::AppConfig;
pub use db::{FlashcardStore, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
