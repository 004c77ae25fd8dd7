//! Request id scoping for error bodies

use axum::{extract::Request, middleware::Next, response::Response};
use cardforge_common::errors::REQUEST_ID;

/// Make the `x-request-id` assigned upstream visible to error responses
pub async fn scope_request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match id {
        Some(id) => REQUEST_ID.scope(id, next.run(request)).await,
        None => next.run(request).await,
    }
}
