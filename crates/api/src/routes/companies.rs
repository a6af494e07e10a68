//! Company onboarding and membership routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use pharmacare_shared::auth::{AddCompanyUserRequest, CreateCompanyRequest};
use pharmacare_shared::types::PrincipalId;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiResult, middleware::AuthUser, routes::auth::principal_json};

/// Creates the company routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/companies", post(create_company))
        .route("/companies/users", post(add_user))
        .route("/companies/users/{user_id}", delete(remove_user))
}

/// POST /companies - Create a company owned by the caller.
///
/// The caller's session still carries the old role; they log in again to
/// pick up `company_admin`.
async fn create_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateCompanyRequest>,
) -> ApiResult<impl IntoResponse> {
    let company = state
        .accounts
        .create_company(&auth.access_request(), &payload.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": company.id.into_inner(),
            "name": company.name,
            "admin_principal_id": company.admin_principal_id.map(PrincipalId::into_inner),
            "subscription_status": company.mirror.status.as_str(),
            "created_at": company.created_at
        })),
    ))
}

/// POST /companies/users - Add a member to the caller's company.
async fn add_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<AddCompanyUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .accounts
        .add_company_user(&auth.access_request(), &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(principal_json(&record))))
}

/// DELETE /companies/users/{user_id} - Remove a member.
async fn remove_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .accounts
        .remove_company_user(&auth.access_request(), PrincipalId::from_uuid(user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
