//! Payment error types.

use pharmacare_shared::AppError;
use thiserror::Error;

use super::gateway::GatewayError;
use crate::ports::StoreError;

/// Errors that can occur while creating or reconciling payments.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No payment with this `tx_ref`.
    #[error("payment {0} not found")]
    NotFound(String),

    /// No principal with the payer's email.
    #[error("no account for {0}")]
    UnknownPayer(String),

    /// Request is missing a field or carries a bad one.
    #[error("{0}")]
    Invalid(String),

    /// Gateway call failed while starting a checkout.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PaymentError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::UnknownPayer(_) => 404,
            Self::Invalid(_) => 400,
            Self::Gateway(_) => 502,
            Self::Store(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "PAYMENT_NOT_FOUND",
            Self::UnknownPayer(_) => "UNKNOWN_PAYER",
            Self::Invalid(_) => "VALIDATION_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound(_) | PaymentError::UnknownPayer(_) => {
                Self::NotFound(err.to_string())
            }
            PaymentError::Invalid(msg) => Self::Validation(msg),
            PaymentError::Gateway(e) => Self::ExternalService(e.to_string()),
            PaymentError::Store(e) => Self::Database(e.to_string()),
        }
    }
}
