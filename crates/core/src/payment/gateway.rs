//! Payment gateway port.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::GatewayOutcome;

/// Errors raised by gateway adapters.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The call did not finish in time.
    #[error("payment gateway timed out")]
    Timeout,

    /// The request could not be sent or the connection dropped.
    #[error("payment gateway unreachable: {0}")]
    Transport(String),

    /// The gateway answered with an error.
    #[error("payment gateway rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway message.
        message: String,
    },

    /// The gateway answered with something we could not read.
    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

/// Parameters for a hosted checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    /// Correlation id.
    pub tx_ref: String,
    /// Amount to charge.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Payer email.
    pub customer_email: String,
    /// Payer display name.
    pub customer_name: String,
    /// Plan being bought, for the checkout description.
    pub plan_id: String,
}

/// What the gateway reports for a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayVerification {
    /// Classified outcome.
    pub outcome: GatewayOutcome,
    /// Amount the gateway captured, when reported.
    pub amount: Option<Decimal>,
    /// Currency the gateway captured, when reported.
    pub currency: Option<String>,
    /// Raw response body.
    pub raw: serde_json::Value,
}

/// Outbound calls to the payment provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a hosted checkout and returns the payment link.
    async fn initialize(&self, request: &CheckoutRequest) -> Result<String, GatewayError>;

    /// Asks the gateway what happened to `tx_ref`.
    async fn verify(&self, tx_ref: &str) -> Result<GatewayVerification, GatewayError>;
}
