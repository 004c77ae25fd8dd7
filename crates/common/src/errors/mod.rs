//! Error types for CardForge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses with field-level validation detail
//! - Error codes for client handling

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

tokio::task_local! {
    /// Id of the request being served, echoed in error bodies
    pub static REQUEST_ID: String;
}

/// Message returned to callers in place of internal failure text
const INTERNAL_MESSAGE: &str = "An internal server error occurred";

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationFailed,
    InvalidFormat,

    // Authentication errors (2xxx)
    Unauthorized,

    // Resource errors (4xxx)
    NotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // Persistence errors (7xxx)
    DatabaseError,
    ConnectionError,
    PersistenceFailed,

    // AI gateway errors (8xxx)
    GenerationFailed,
    GenerationParseFailed,
    GenerationTimeout,
    GenerationCancelled,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationFailed => 1001,
            ErrorCode::InvalidFormat => 1002,

            ErrorCode::Unauthorized => 2001,

            ErrorCode::NotFound => 4001,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::PersistenceFailed => 7003,

            ErrorCode::GenerationFailed => 8001,
            ErrorCode::GenerationParseFailed => 8002,
            ErrorCode::GenerationTimeout => 8003,
            ErrorCode::GenerationCancelled => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }

    /// Short label used for system log rows
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ConnectionError => "CONNECTION_ERROR",
            ErrorCode::PersistenceFailed => "PERSISTENCE_FAILED",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::GenerationParseFailed => "GENERATION_PARSE_FAILED",
            ErrorCode::GenerationTimeout => "GENERATION_TIMEOUT",
            ErrorCode::GenerationCancelled => "GENERATION_CANCELLED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Resource errors. Deliberately identical for "missing" and "owned by
    // another user".
    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: String },

    // Rate limiting
    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    // Persistence errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Failed to save flashcards batch {chunk} of {total_chunks}: {message}")]
    Persistence {
        chunk: usize,
        total_chunks: usize,
        message: String,
    },

    // AI gateway errors
    #[error("AI service error: {message}")]
    GenerationService { message: String },

    #[error("Malformed AI response: {message}")]
    GenerationParse { message: String },

    #[error("AI generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    #[error("AI generation was cancelled")]
    GenerationCancelled,

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

}

impl AppError {
    /// Validation failure for a single field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: vec![field.to_string()],
        }
    }

    /// Uniform not-found error for a flashcard id
    pub fn flashcard_not_found(id: impl ToString) -> Self {
        AppError::NotFound {
            resource: "Flashcard",
            id: id.to_string(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationFailed,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Persistence { .. } => ErrorCode::PersistenceFailed,
            AppError::GenerationService { .. } => ErrorCode::GenerationFailed,
            AppError::GenerationParse { .. } => ErrorCode::GenerationParseFailed,
            AppError::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,
            AppError::GenerationCancelled => ErrorCode::GenerationCancelled,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 401 Unauthorized
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 408 Request Timeout (the caller walked away)
            AppError::GenerationCancelled => StatusCode::REQUEST_TIMEOUT,

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Persistence { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::GenerationService { .. } | AppError::GenerationParse { .. } => {
                StatusCode::BAD_GATEWAY
            }

            // 504 Gateway Timeout
            AppError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Whether the UI may offer "try again" for this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::GenerationService { .. }
                | AppError::GenerationTimeout { .. }
                | AppError::GenerationCancelled
                | AppError::RateLimited
        )
    }

    /// Message safe to return to callers.
    ///
    /// Storage and internal failures are reported generically; their full
    /// text only goes to the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_) => INTERNAL_MESSAGE.to_string(),
            AppError::Persistence {
                chunk,
                total_chunks,
                ..
            } => format!(
                "Failed to save flashcards batch {} of {}",
                chunk, total_chunks
            ),
            other => other.to_string(),
        }
    }

    /// Field paths reported by a validation failure
    pub fn fields(&self) -> &[String] {
        match self {
            AppError::Validation { fields, .. } => fields,
            _ => &[],
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_paths("", &errors, &mut fields);
        fields.sort();
        fields.dedup();

        let message = if fields.is_empty() {
            "invalid input".to_string()
        } else {
            format!("invalid value for {}", fields.join(", "))
        };

        AppError::Validation { message, fields }
    }
}

fn collect_field_paths(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(_) => out.push(path),
            ValidationErrorsKind::Struct(inner) => collect_field_paths(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_paths(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
                retryable: self.is_retryable(),
                fields: self.fields().to_vec(),
                request_id: REQUEST_ID.try_with(Clone::clone).ok(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        let message = rejection.body_text();
        AppError::Validation {
            fields: rejected_query_field(&message).into_iter().collect(),
            message,
        }
    }
}

// "Failed to deserialize query string: page: invalid digit found in string"
fn rejected_query_field(text: &str) -> Option<String> {
    let (_, detail) = text.split_once("query string: ")?;
    let (path, _) = detail.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then(|| path.to_string())
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidFormat {
            message: rejection.body_text(),
        }
    }
}
