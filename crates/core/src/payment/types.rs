//! Payment domain types.

use chrono::{DateTime, Utc};
use pharmacare_shared::billing::VerifyPaymentResponse;
use pharmacare_shared::types::PaymentId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entitlement::Entitlement;

/// Payment record status.
///
/// Valid transitions:
/// - Pending → Paid (gateway confirmed success)
/// - Pending → Failed (gateway confirmed failure)
///
/// Paid and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting confirmation.
    Pending,
    /// Confirmed paid.
    Paid,
    /// Confirmed failed.
    Failed,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Parses a stored status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }

    /// The status a gateway outcome moves this status to, if any.
    #[must_use]
    pub const fn transition(self, outcome: GatewayOutcome) -> Option<Self> {
        match (self, outcome) {
            (Self::Pending, GatewayOutcome::Success) => Some(Self::Paid),
            (Self::Pending, GatewayOutcome::Failure) => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the gateway says happened to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Money was captured.
    Success,
    /// The charge definitively failed or was abandoned.
    Failure,
    /// Still in flight, or a status we do not recognise.
    Pending,
}

impl GatewayOutcome {
    /// Classifies a gateway status string.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "successful" | "success" | "completed" => Self::Success,
            "failed" | "cancelled" | "canceled" | "error" => Self::Failure,
            _ => Self::Pending,
        }
    }
}

/// A checkout attempt, keyed by its unique `tx_ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    /// Row ID.
    pub id: PaymentId,
    /// Correlation id shared with the gateway.
    pub tx_ref: String,
    /// Normalized email of the payer.
    pub principal_email: String,
    /// Plan purchased.
    pub plan_id: String,
    /// Amount charged.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Current status.
    pub status: PaymentStatus,
    /// Last raw payload received from the gateway.
    pub gateway_response: serde_json::Value,
    /// When the payment was confirmed.
    pub paid_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Result of starting a checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    /// Correlation id.
    pub tx_ref: String,
    /// Hosted payment link.
    pub payment_url: String,
    /// Amount to be charged.
    pub amount: Decimal,
    /// Currency.
    pub currency: String,
}

/// How a webhook delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    /// This delivery moved the record to a terminal status.
    Applied(PaymentStatus),
    /// Nothing changed; the record is in the given status.
    Unchanged(PaymentStatus),
}

impl WebhookAck {
    /// Status of the record after the delivery.
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        match self {
            Self::Applied(status) | Self::Unchanged(status) => *status,
        }
    }
}

/// Result of verify-on-demand.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    /// Correlation id.
    pub tx_ref: String,
    /// Status after verification.
    pub status: PaymentStatus,
    /// Payer's entitlement, once paid.
    pub entitlement: Option<Entitlement>,
}

impl VerificationReport {
    /// Client-facing form.
    #[must_use]
    pub fn to_response(&self) -> VerifyPaymentResponse {
        VerifyPaymentResponse {
            is_paid: self.status == PaymentStatus::Paid,
            status: self.status.as_str().to_string(),
            subscription_end_date: self.entitlement.as_ref().and_then(|e| e.end_date),
        }
    }
}
