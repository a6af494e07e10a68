//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - Bearer authentication middleware and the [`middleware::AuthUser`] extractor
//! - Error to JSON response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, header::AUTHORIZATION};
use mockable::Clock;
use pharmacare_core::session::AuthError;
use pharmacare_core::{AccountService, PaymentReconciler, SessionIssuer, StoreHandles};
use pharmacare_shared::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Login and profile.
    pub sessions: Arc<SessionIssuer>,
    /// Registration, approval, and company membership.
    pub accounts: Arc<AccountService>,
    /// Checkout, webhook, and verify.
    pub payments: Arc<PaymentReconciler>,
    /// Show detailed authentication failures.
    pub verbose_errors: bool,
    /// Expected `verif-hash` header on webhook deliveries.
    pub webhook_hash: Option<Arc<str>>,
}

impl AppState {
    /// Wires the services over one set of store handles.
    #[must_use]
    pub fn new(
        stores: &StoreHandles,
        jwt_service: Arc<JwtService>,
        payments: PaymentReconciler,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionIssuer::new(
                stores,
                Arc::clone(&jwt_service),
                Arc::clone(&clock),
            )),
            accounts: Arc::new(AccountService::new(stores, clock)),
            payments: Arc::new(payments),
            jwt_service,
            verbose_errors: false,
            webhook_hash: None,
        }
    }

    /// Sets verbose authentication errors.
    #[must_use]
    pub const fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    /// Requires webhook deliveries to carry this `verif-hash`.
    #[must_use]
    pub fn with_webhook_hash(mut self, hash: Option<String>) -> Self {
        self.webhook_hash = hash.filter(|h| !h.is_empty()).map(Arc::from);
        self
    }

    pub(crate) fn auth_error(&self, err: AuthError) -> ApiError {
        ApiError(err.into_app_error(self.verbose_errors))
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let sensitive = [
        AUTHORIZATION,
        HeaderName::from_static(routes::payments::VERIF_HASH_HEADER),
    ];

    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new(sensitive))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
