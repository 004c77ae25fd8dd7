//! Flashcard generation handler

use crate::handlers::report_failure;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use cardforge_common::{
    auth::AuthContext,
    errors::Result,
    flashcards::{GenerateFlashcardsRequest, GenerateFlashcardsResponse},
};

/// Propose flashcards for a source text. Nothing is saved.
///
/// The call runs under a child of the shutdown token, so shutdown aborts
/// in-flight generations. A client disconnect drops the handler future and
/// with it the outstanding AI request.
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: std::result::Result<Json<GenerateFlashcardsRequest>, JsonRejection>,
) -> Result<Json<GenerateFlashcardsResponse>> {
    let Json(request) = payload?;
    let cancel = state.shutdown.child_token();

    match state.generation.generate(&request, &cancel).await {
        Ok(candidates) => Ok(Json(GenerateFlashcardsResponse {
            flashcards_proposals: candidates,
        })),
        Err(err) => {
            tracing::debug!(request_id = %auth.request_id, error = %err, "Generate request failed");
            report_failure(&state, Some(auth.user_id), &err, Some(state.generation.model_name())).await;
            Err(err)
        }
    }
}
