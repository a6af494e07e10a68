//! Login and session token issuing.

pub mod error;
pub mod issuer;

pub use error::{AuthError, CredentialFailure};
pub use issuer::{LoginOutcome, SessionIssuer, build_profile};
