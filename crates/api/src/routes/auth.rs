//! Authentication routes: login, registration, profile, password change.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use pharmacare_core::principal::PrincipalRecord;
use pharmacare_shared::auth::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use pharmacare_shared::types::CompanyId;
use serde_json::{Value, json};

use crate::{AppState, error::ApiResult, middleware::AuthUser};

/// Public auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
}

/// Auth routes that need a session.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/password", post(change_password))
}

/// POST /auth/login - Check credentials and issue a session token.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .sessions
        .login(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "login rejected");
            state.auth_error(e)
        })?;

    Ok(Json(outcome.into_response()))
}

/// POST /auth/register - Create an unapproved account.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = state.accounts.register(&payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration received; the account is pending approval",
            "user": principal_json(&record)
        })),
    ))
}

/// GET /auth/me - Caller's profile with fresh entitlement.
async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<impl IntoResponse> {
    let profile = state
        .sessions
        .profile(auth.claims())
        .await
        .map_err(|e| state.auth_error(e))?;
    Ok(Json(profile))
}

/// POST /auth/password - Change the caller's password.
async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .accounts
        .change_password(
            auth.principal_id(),
            &payload.current_password,
            &payload.new_password,
        )
        .await?;
    Ok(Json(json!({ "message": "Password updated" })))
}

/// Public view of a principal row; never includes the hash.
pub(crate) fn principal_json(record: &PrincipalRecord) -> Value {
    json!({
        "id": record.id.into_inner(),
        "email": record.email,
        "full_name": record.full_name,
        "role": record.role.as_str(),
        "account_kind": record.account_kind.as_str(),
        "approved": record.approved,
        "company_id": record.company_id.map(CompanyId::into_inner),
        "subscription_status": record.mirror.status.as_str(),
        "created_at": record.created_at
    })
}
