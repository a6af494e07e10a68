//! Session claims and auth/company request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims carried by a session token.
///
/// Entitlement is deliberately absent: it changes asynchronously and is read
/// fresh on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal ID).
    pub sub: Uuid,
    /// Normalized email.
    pub email: String,
    /// Principal role (`admin`, `company_admin`, `company_user`, `pharmacist`, ...).
    pub role: String,
    /// Effective account kind resolved at login.
    pub account_kind: String,
    /// Company the principal belongs to, if any.
    pub company_id: Option<Uuid>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a principal.
    #[must_use]
    pub fn new(
        principal_id: Uuid,
        email: &str,
        role: &str,
        account_kind: &str,
        company_id: Option<Uuid>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: principal_id,
            email: email.to_string(),
            role: role.to_string(),
            account_kind: account_kind.to_string(),
            company_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the principal ID from claims.
    #[must_use]
    pub const fn principal_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the company ID from claims.
    #[must_use]
    pub const fn company_id(&self) -> Option<Uuid> {
        self.company_id
    }
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Principal email.
    #[serde(default)]
    pub email: String,
    /// Principal password.
    #[serde(default)]
    pub password: String,
}

/// Login response payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Signed session token.
    pub token: String,
    /// Resolved profile.
    pub user: UserProfile,
    /// Effective account kind (`individual`, `company`, `company_user`).
    pub user_type: String,
}

/// Principal profile with merged entitlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Principal ID.
    pub id: Uuid,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Role.
    pub role: String,
    /// Effective account kind.
    pub account_kind: String,
    /// Whether the principal is approved.
    pub approved: bool,
    /// Company membership, if any.
    pub company_id: Option<Uuid>,
    /// Current entitlement.
    pub subscription: SubscriptionInfo,
}

/// Entitlement as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// `active` or `inactive`.
    pub status: String,
    /// Plan identifier, if any.
    pub plan_id: Option<String>,
    /// When the entitlement lapses.
    pub end_date: Option<DateTime<Utc>>,
    /// Where the answer came from (`principal`, `company`, `history`, `none`).
    pub source: String,
}

/// Registration request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Principal email.
    pub email: String,
    /// Principal password.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Professional role; defaults to `pharmacist`.
    #[serde(default)]
    pub role: Option<String>,
    /// `individual` (default) or `company`.
    #[serde(default)]
    pub account_kind: Option<String>,
}

/// Password change request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password.
    pub current_password: String,
    /// Replacement password.
    pub new_password: String,
}

/// Create company request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyRequest {
    /// Company name.
    pub name: String,
}

/// Add a member to the caller's company.
#[derive(Debug, Clone, Deserialize)]
pub struct AddCompanyUserRequest {
    /// Member email.
    pub email: String,
    /// Initial password.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Professional role; defaults to `company_user`.
    #[serde(default)]
    pub role: Option<String>,
}
