//! API handlers module

pub mod flashcards;
pub mod generate;
pub mod health;
pub mod usage;

use crate::AppState;
use cardforge_common::db::NewSystemLog;
use cardforge_common::errors::AppError;
use uuid::Uuid;

/// Record a failed operation in the system log.
///
/// Only server-side and retryable failures are kept; a failing sink is
/// logged and otherwise ignored so the caller still sees the original error.
pub async fn report_failure(state: &AppState, user_id: Option<Uuid>, err: &AppError, model: Option<&str>) {
    if !(err.is_server_error() || err.is_retryable()) {
        return;
    }

    let entry = NewSystemLog {
        user_id,
        error_code: err.code().as_str().to_string(),
        error_message: err.to_string(),
        model: model.map(str::to_string),
    };

    if let Err(sink_err) = state.system_log.record(entry).await {
        tracing::warn!(error = %sink_err, original = %err, "Failed to write system log entry");
    }
}
