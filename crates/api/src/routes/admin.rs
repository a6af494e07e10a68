//! Platform administration: approving and rejecting registrations.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use pharmacare_shared::types::PrincipalId;
use uuid::Uuid;

use crate::{AppState, error::ApiResult, middleware::AuthUser, routes::auth::principal_json};

/// Creates the admin routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/principals/{id}/approve", post(approve))
        .route("/admin/principals/{id}", delete(reject))
}

/// POST /admin/principals/{id}/approve
async fn approve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .accounts
        .approve(&auth.access_request(), PrincipalId::from_uuid(id))
        .await?;
    Ok(Json(principal_json(&record)))
}

/// DELETE /admin/principals/{id} - Reject a pending registration.
async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .accounts
        .reject(&auth.access_request(), PrincipalId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
