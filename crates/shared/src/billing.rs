//! Payment and subscription payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkout initiation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    /// Plan being purchased (e.g. `individual_monthly`).
    #[serde(alias = "planId")]
    pub plan_id: String,
    /// Email of the paying principal.
    pub email: String,
    /// Amount override; the plan's list price is used when absent.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Currency override.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Checkout initiation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    /// Hosted checkout URL.
    pub payment_url: String,
    /// Correlation id for webhook and verification.
    pub tx_ref: String,
}

/// Gateway callback body.
///
/// Accepts both the flat `{tx_ref, status}` shape and the gateway's
/// `{event, data: {tx_ref, status}}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Correlation id.
    #[serde(default, alias = "txRef", alias = "txref")]
    pub tx_ref: Option<String>,
    /// Gateway status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Nested envelope body.
    #[serde(default)]
    pub data: Option<WebhookData>,
}

/// Nested webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    /// Correlation id.
    #[serde(default, alias = "txRef", alias = "txref")]
    pub tx_ref: Option<String>,
    /// Gateway status string.
    #[serde(default)]
    pub status: Option<String>,
}

impl WebhookPayload {
    /// Returns the correlation id from either payload shape.
    #[must_use]
    pub fn tx_ref(&self) -> Option<&str> {
        self.tx_ref
            .as_deref()
            .or_else(|| self.data.as_ref().and_then(|d| d.tx_ref.as_deref()))
    }

    /// Returns the status from either payload shape.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status
            .as_deref()
            .or_else(|| self.data.as_ref().and_then(|d| d.status.as_deref()))
    }
}

/// Verification response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    /// True once the payment is recorded as paid.
    pub is_paid: bool,
    /// `pending`, `paid`, or `failed`.
    pub status: String,
    /// End of the entitlement granted by this payment, once paid.
    pub subscription_end_date: Option<DateTime<Utc>>,
}

/// One subscription history row as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEventView {
    /// Event ID.
    pub id: Uuid,
    /// Principal that paid.
    pub principal_id: Uuid,
    /// Company covered, if any.
    pub company_id: Option<Uuid>,
    /// Plan identifier.
    pub plan_id: String,
    /// Event status.
    pub status: String,
    /// Start of the term.
    pub start_date: DateTime<Utc>,
    /// End of the term.
    pub end_date: DateTime<Utc>,
    /// Payment correlation id.
    pub tx_ref: String,
}
