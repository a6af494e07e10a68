//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod admin;
pub mod auth;
pub mod companies;
pub mod health;
pub mod payments;
pub mod subscriptions;

/// Creates the API router, wrapping protected routes in the auth middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(companies::routes())
        .merge(admin::routes())
        .merge(subscriptions::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Payment callbacks carry no session; the webhook checks its own header.
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(payments::routes())
        .merge(protected_routes)
}
