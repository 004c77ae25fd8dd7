//! Flashcard management handlers

use crate::handlers::report_failure;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use cardforge_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    flashcards::{
        ApproveFlashcardsRequest, ApproveFlashcardsResponse, CreateFlashcardRequest, FlashcardView,
        ListFlashcardsParams, PaginatedResponse, UpdateFlashcardRequest,
    },
};
use uuid::Uuid;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type FlashcardId = std::result::Result<Path<Uuid>, PathRejection>;

/// Log a failure to the system log, then hand it back
async fn failed(state: &AppState, auth: &AuthContext, err: AppError) -> AppError {
    report_failure(state, Some(auth.user_id), &err, None).await;
    err
}

/// Persist reviewed candidates
pub async fn approve(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: JsonBody<ApproveFlashcardsRequest>,
) -> Result<(StatusCode, Json<ApproveFlashcardsResponse>)> {
    let Json(request) = payload?;

    match state.approval.approve(auth.user_id, request).await {
        Ok(outcome) => Ok((
            StatusCode::CREATED,
            Json(ApproveFlashcardsResponse {
                approved: outcome.approved.into_iter().map(FlashcardView::from).collect(),
                count: outcome.count,
            }),
        )),
        Err(err) => Err(failed(&state, &auth, err).await),
    }
}

/// Create a hand-written flashcard
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: JsonBody<CreateFlashcardRequest>,
) -> Result<(StatusCode, Json<FlashcardView>)> {
    let Json(request) = payload?;

    match state.flashcards.create_manual(auth.user_id, request).await {
        Ok(card) => Ok((StatusCode::CREATED, Json(card.into()))),
        Err(err) => Err(failed(&state, &auth, err).await),
    }
}

/// List the caller's flashcards
pub async fn list(
    State(state): State<AppState>,
    auth: AuthContext,
    params: std::result::Result<Query<ListFlashcardsParams>, QueryRejection>,
) -> Result<Json<PaginatedResponse<FlashcardView>>> {
    let Query(params) = params?;

    match state.flashcards.list(auth.user_id, params).await {
        Ok(page) => Ok(Json(page)),
        Err(err) => Err(failed(&state, &auth, err).await),
    }
}

pub async fn get_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    id: FlashcardId,
) -> Result<Json<FlashcardView>> {
    let Path(id) = id?;

    match state.flashcards.get(auth.user_id, id).await {
        Ok(card) => Ok(Json(card.into())),
        Err(err) => Err(failed(&state, &auth, err).await),
    }
}

pub async fn update_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    id: FlashcardId,
    payload: JsonBody<UpdateFlashcardRequest>,
) -> Result<Json<FlashcardView>> {
    let Path(id) = id?;
    let Json(request) = payload?;

    match state.flashcards.update(auth.user_id, id, request).await {
        Ok(card) => Ok(Json(card.into())),
        Err(err) => Err(failed(&state, &auth, err).await),
    }
}

pub async fn delete_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    id: FlashcardId,
) -> Result<StatusCode> {
    let Path(id) = id?;

    match state.flashcards.delete(auth.user_id, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => Err(failed(&state, &auth, err).await),
    }
}
