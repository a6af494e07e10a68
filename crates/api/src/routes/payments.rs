//! Payment routes: checkout, gateway webhook, and verify-on-demand.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use pharmacare_core::payment::WebhookAck;
use pharmacare_shared::AppError;
use pharmacare_shared::billing::{CreatePaymentRequest, CreatePaymentResponse, WebhookPayload};
use serde_json::{Value, json};
use subtle::ConstantTimeEq;

use crate::{AppState, error::ApiResult};

/// Header the provider signs webhook deliveries with.
pub const VERIF_HASH_HEADER: &str = "verif-hash";

/// Creates the payment routes. None of them require a session.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/create", post(create_payment))
        .route("/payments/webhook", post(webhook))
        .route("/payments/{tx_ref}/verify", get(verify_payment))
}

/// POST /payments/create - Start a hosted checkout.
async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    let checkout = state.payments.create_payment(&payload).await?;
    Ok(Json(CreatePaymentResponse {
        payment_url: checkout.payment_url,
        tx_ref: checkout.tx_ref,
    }))
}

/// POST /payments/webhook - Apply a gateway callback.
///
/// Recognized references always get 200, including no-op deliveries, so the
/// provider stops retrying.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    if let Some(expected) = state.webhook_hash.as_deref() {
        let presented = headers.get(VERIF_HASH_HEADER).map(|v| v.as_bytes());
        if !presented.is_some_and(|presented| hash_matches(presented, expected)) {
            tracing::warn!("webhook rejected: verif-hash mismatch");
            return Err(AppError::Unauthorized("invalid webhook signature".into()).into());
        }
    }

    let payload: WebhookPayload = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::Validation(format!("malformed webhook body: {e}")))?;
    let tx_ref = payload
        .tx_ref()
        .ok_or_else(|| AppError::Validation("tx_ref is required".into()))?;
    let status = payload.status().unwrap_or_default();

    let ack = state.payments.handle_webhook(tx_ref, status, raw).await?;

    Ok(Json(json!({
        "tx_ref": tx_ref,
        "status": ack.status().as_str(),
        "applied": matches!(ack, WebhookAck::Applied(_))
    })))
}

/// Compares the presented webhook hash without short-circuiting on content.
fn hash_matches(presented: &[u8], expected: &str) -> bool {
    presented.ct_eq(expected.as_bytes()).into()
}

/// GET /payments/{tx_ref}/verify - Reconcile a payment with the gateway.
async fn verify_payment(
    State(state): State<AppState>,
    Path(tx_ref): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let report = state.payments.verify(&tx_ref).await?;
    Ok(Json(report.to_response()))
}
