//! Account lifecycle error types.

use pharmacare_shared::AppError;
use thiserror::Error;

use crate::access::AccessDenied;
use crate::auth::PasswordError;
use crate::ports::StoreError;

/// Errors raised by registration, approval, and company membership
/// operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// A field is missing or malformed.
    #[error("{0}")]
    Invalid(String),

    /// The email already exists in one of the principal stores.
    #[error("an account with email {0} already exists")]
    EmailTaken(String),

    /// The target principal or company does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The caller's role does not permit the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The target is outside the caller's access scope.
    #[error(transparent)]
    OutOfScope(#[from] AccessDenied),

    /// The operation conflicts with current state.
    #[error("{0}")]
    Conflict(String),

    /// Current password did not match.
    #[error("current password is incorrect")]
    WrongPassword,

    /// Password policy or hashing failure.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Invalid(_) | Self::WrongPassword => 400,
            Self::Password(PasswordError::TooShort) => 400,
            Self::Forbidden(_) | Self::OutOfScope(_) => 403,
            Self::NotFound(_) => 404,
            Self::EmailTaken(_) | Self::Conflict(_) => 409,
            Self::Password(_) | Self::Store(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) | Self::Password(PasswordError::TooShort) => "VALIDATION_ERROR",
            Self::EmailTaken(_) => "EMAIL_TAKEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::OutOfScope(_) => "ACCESS_DENIED",
            Self::Conflict(_) => "CONFLICT",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::Password(_) => "INTERNAL_ERROR",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        let message = err.to_string();
        match err {
            AccountError::Invalid(_)
            | AccountError::WrongPassword
            | AccountError::Password(PasswordError::TooShort) => Self::Validation(message),
            AccountError::Forbidden(_) | AccountError::OutOfScope(_) => Self::Forbidden(message),
            AccountError::NotFound(_) => Self::NotFound(message),
            AccountError::EmailTaken(_) | AccountError::Conflict(_) => Self::Conflict(message),
            AccountError::Password(_) => Self::Internal(message),
            AccountError::Store(e) => Self::from(e),
        }
    }
}
