//! Authentication error types.

use pharmacare_shared::{AppError, JwtError};
use thiserror::Error;

use crate::ports::StoreError;

/// Why a credential check failed. Only shown in verbose mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    /// No principal has that email.
    UnknownEmail,
    /// Password did not match.
    WrongPassword,
    /// Stored hash could not be parsed.
    UnusableHash,
}

impl CredentialFailure {
    /// Detailed message for verbose mode.
    #[must_use]
    pub const fn detail(&self) -> &'static str {
        match self {
            Self::UnknownEmail => "no account with that email",
            Self::WrongPassword => "password does not match",
            Self::UnusableHash => "stored credentials are unusable",
        }
    }
}

/// Errors raised while logging in or authenticating a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password was empty.
    #[error("email and password are required")]
    MissingCredentials,

    /// Email or password was wrong.
    #[error("invalid email or password")]
    InvalidCredentials(CredentialFailure),

    /// The principal has not been approved yet.
    #[error("account is pending approval")]
    PendingApproval,

    /// No bearer token on a protected request.
    #[error("missing authorization token")]
    MissingToken,

    /// Bearer token is malformed or forged.
    #[error("invalid token")]
    InvalidToken,

    /// Bearer token has expired.
    #[error("token expired")]
    ExpiredToken,

    /// The token's principal no longer exists.
    #[error("account no longer exists")]
    UnknownPrincipal,

    /// A store call failed.
    #[error("authentication store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Token could not be signed.
    #[error("failed to issue session token: {0}")]
    TokenIssue(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredentials => 400,
            Self::InvalidCredentials(_)
            | Self::MissingToken
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::UnknownPrincipal => 401,
            Self::PendingApproval => 403,
            Self::StoreUnavailable(_) | Self::TokenIssue(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::ExpiredToken => "TOKEN_EXPIRED",
            Self::UnknownPrincipal => "UNKNOWN_PRINCIPAL",
            Self::StoreUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::TokenIssue(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to the client.
    ///
    /// Credential failures collapse to one generic message unless `verbose`
    /// is set. Server-side failures never leak their cause.
    #[must_use]
    pub fn public_message(&self, verbose: bool) -> String {
        match self {
            Self::InvalidCredentials(failure) if verbose => {
                format!("invalid email or password: {}", failure.detail())
            }
            Self::StoreUnavailable(e) if verbose => format!("authentication unavailable: {e}"),
            Self::StoreUnavailable(_) | Self::TokenIssue(_) => {
                "authentication is temporarily unavailable".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Converts into the shared application error.
    #[must_use]
    pub fn into_app_error(self, verbose: bool) -> AppError {
        let message = self.public_message(verbose);
        match self.status_code() {
            400 => AppError::Validation(message),
            401 => AppError::Unauthorized(message),
            403 => AppError::Forbidden(message),
            _ => AppError::Internal(message),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::ExpiredToken,
            JwtError::DecodingError(_) => Self::InvalidToken,
            JwtError::EncodingError(e) => Self::TokenIssue(e),
        }
    }
}
