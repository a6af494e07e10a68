//! Subscription history.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use pharmacare_core::entitlement::SubscriptionEvent;
use pharmacare_shared::billing::SubscriptionEventView;

use crate::{AppState, error::ApiResult, middleware::AuthUser};

/// Creates the subscription routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/subscriptions/history", get(history))
}

/// GET /subscriptions/history - Events for the caller and their company,
/// newest first.
async fn history(State(state): State<AppState>, auth: AuthUser) -> ApiResult<impl IntoResponse> {
    let events = state.accounts.history(&auth.access_request()).await?;
    let views: Vec<SubscriptionEventView> = events.iter().map(SubscriptionEvent::to_view).collect();
    Ok(Json(views))
}
