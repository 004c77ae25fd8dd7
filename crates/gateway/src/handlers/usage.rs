//! AI usage statistics

use crate::AppState;
use axum::{extract::State, Json};
use cardforge_common::{ai::UsageSnapshot, auth::AuthContext};

/// Per-model request and token counts since startup
pub async fn usage(State(state): State<AppState>, _auth: AuthContext) -> Json<UsageSnapshot> {
    Json(state.usage.snapshot())
}
