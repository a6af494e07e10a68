//! Payment state machine and reconciliation.
//!
//! # Modules
//!
//! - `types` - Payment status, records, gateway outcomes
//! - `error` - Payment-specific error types
//! - `gateway` - Outbound payment provider port
//! - `reconciler` - Webhook and verify-on-demand handling, entitlement propagation

pub mod error;
pub mod gateway;
pub mod reconciler;
pub mod types;

pub use error::PaymentError;
pub use gateway::{CheckoutRequest, GatewayError, GatewayVerification, PaymentGateway};
pub use reconciler::{DEFAULT_VERIFY_TIMEOUT, PaymentReconciler, TX_REF_PREFIX};
pub use types::{
    Checkout, GatewayOutcome, PaymentRecord, PaymentStatus, VerificationReport, WebhookAck,
};
